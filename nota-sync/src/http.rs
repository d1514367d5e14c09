//! reqwest implementations of the fetch and store collaborators.
//!
//! Receipt pages are fetched through a CORS proxy (`GET {proxy}?url=...`).
//! The store speaks JSON rows shaped like the `produtos_historico` table:
//!   { id, nome, categoria, empresa, data, valor_unitario }

use std::time::Duration;

use anyhow::{anyhow, Context, Result};
use chrono::NaiveDate;
use nota_core::dates::to_store_format;
use nota_core::{normalize_date, Category, Classifier, NewPriceRecord, PriceRecord};
use reqwest::Url;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::gateway::{PriceStore, ReceiptFetcher};

fn client(timeout: Duration) -> Result<reqwest::Client> {
    reqwest::Client::builder()
        .timeout(timeout)
        .build()
        .context("build http client")
}

#[derive(Debug, Clone)]
pub struct ProxyFetcher {
    client: reqwest::Client,
    proxy_url: String,
}

impl ProxyFetcher {
    pub fn new(proxy_url: impl Into<String>, timeout: Duration) -> Result<Self> {
        Ok(Self {
            client: client(timeout)?,
            proxy_url: proxy_url.into(),
        })
    }
}

impl ReceiptFetcher for ProxyFetcher {
    async fn fetch(&self, url: &str) -> Result<String> {
        debug!(url, proxy = %self.proxy_url, "fetching receipt");
        let resp = self
            .client
            .get(&self.proxy_url)
            .query(&[("url", url)])
            .send()
            .await
            .with_context(|| format!("GET {}", self.proxy_url))?
            .error_for_status()?;
        Ok(resp.text().await?)
    }
}

/// Price value as returned by the store: Postgres NUMERIC arrives as a string
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
enum Numeric {
    Number(f64),
    Text(String),
}

impl Numeric {
    fn value(&self) -> Result<f64> {
        match self {
            Numeric::Number(n) => Ok(*n),
            Numeric::Text(s) => s
                .trim()
                .parse()
                .map_err(|_| anyhow!("invalid valor_unitario '{s}'")),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
enum RowId {
    Number(i64),
    Text(String),
}

impl std::fmt::Display for RowId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RowId::Number(n) => write!(f, "{n}"),
            RowId::Text(s) => f.write_str(s),
        }
    }
}

/// Store row as read back from the API
#[derive(Debug, Clone, Deserialize)]
struct ProdutoRow {
    id: RowId,
    nome: String,
    #[serde(default)]
    categoria: Option<String>,
    empresa: String,
    data: String,
    valor_unitario: Numeric,
}

impl ProdutoRow {
    /// Rows written before classification existed carry `outros`; re-derive
    /// their category from the product name.
    fn into_record(self, classifier: &Classifier) -> Result<PriceRecord> {
        let category = match self.categoria.as_deref().and_then(Category::parse) {
            Some(c) if c != Category::Other => c,
            _ => classifier.classify(&self.nome),
        };
        let purchase_date =
            normalize_date(&self.data).with_context(|| format!("row {} has a bad date", self.id))?;
        Ok(PriceRecord {
            id: self.id.to_string(),
            product_name: self.nome,
            category,
            vendor_name: self.empresa,
            purchase_date,
            unit_price: self.valor_unitario.value()?.max(0.0),
        })
    }
}

#[derive(Debug, Serialize)]
struct NewProdutoRow<'a> {
    nome: &'a str,
    categoria: &'a str,
    empresa: &'a str,
    data: String,
    valor_unitario: f64,
}

impl<'a> From<&'a NewPriceRecord> for NewProdutoRow<'a> {
    fn from(r: &'a NewPriceRecord) -> Self {
        Self {
            nome: &r.product_name,
            categoria: r.category.as_str(),
            empresa: &r.vendor_name,
            data: to_store_format(r.purchase_date),
            valor_unitario: r.unit_price,
        }
    }
}

#[derive(Debug, Clone)]
pub struct HttpPriceStore {
    client: reqwest::Client,
    base_url: Url,
    classifier: Classifier,
}

impl HttpPriceStore {
    pub fn new(base_url: &str, timeout: Duration, classifier: Classifier) -> Result<Self> {
        let base_url = Url::parse(base_url).with_context(|| format!("invalid api url {base_url}"))?;
        Ok(Self {
            client: client(timeout)?,
            base_url,
            classifier,
        })
    }

    fn endpoint(&self, segments: &[&str]) -> Result<Url> {
        let mut url = self.base_url.clone();
        url.path_segments_mut()
            .map_err(|_| anyhow!("api url cannot be a base: {}", self.base_url))?
            .pop_if_empty()
            .extend(segments);
        Ok(url)
    }

    fn decode(&self, rows: Vec<ProdutoRow>) -> Result<Vec<PriceRecord>> {
        rows.into_iter()
            .map(|row| row.into_record(&self.classifier))
            .collect()
    }

    /// Entries of one product within a calendar year, oldest first
    pub async fn product_history(&self, product_name: &str, year: i32) -> Result<Vec<PriceRecord>> {
        let url = self.endpoint(&["produtos", product_name, "lancamentos"])?;
        let rows: Vec<ProdutoRow> = self
            .client
            .get(url)
            .query(&[("ano", year.to_string())])
            .send()
            .await
            .context("GET product history")?
            .error_for_status()?
            .json()
            .await
            .context("decode product history")?;
        self.decode(rows)
    }
}

impl PriceStore for HttpPriceStore {
    async fn list_all(&self) -> Result<Vec<PriceRecord>> {
        let url = self.endpoint(&["produtos"])?;
        let rows: Vec<ProdutoRow> = self
            .client
            .get(url)
            .send()
            .await
            .context("GET /produtos")?
            .error_for_status()?
            .json()
            .await
            .context("decode /produtos")?;
        self.decode(rows)
    }

    async fn insert(&self, record: &NewPriceRecord) -> Result<PriceRecord> {
        let url = self.endpoint(&["produtos"])?;
        let row: ProdutoRow = self
            .client
            .post(url)
            .json(&NewProdutoRow::from(record))
            .send()
            .await
            .context("POST /produtos")?
            .error_for_status()?
            .json()
            .await
            .context("decode inserted row")?;
        row.into_record(&self.classifier)
    }

    async fn delete_by_vendor_and_date(&self, vendor_name: &str, date: NaiveDate) -> Result<()> {
        let url = self.endpoint(&["produtos"])?;
        self.client
            .delete(url)
            .query(&[("empresa", vendor_name.to_string()), ("data", to_store_format(date))])
            .send()
            .await
            .context("DELETE /produtos")?
            .error_for_status()?;
        Ok(())
    }
}
