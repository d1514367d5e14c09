use std::collections::HashMap;
use std::sync::Mutex;

use anyhow::{anyhow, bail, Result};
use chrono::NaiveDate;
use nota_core::{vendor_comparison, Category, Classifier, NewPriceRecord, PriceRecord};
use nota_ingest::NfceParser;
use nota_sync::{
    IngestError, IngestOutcome, Ingestor, KnownReceipt, PriceStore, ReceiptCache, ReceiptFetcher,
};

const KEY_A: &str = "43250393015006000113650010001234561000001234";
const URL_A: &str =
    "https://dfe-portal.svrs.rs.gov.br/Dfe/QrCodeNFce?p=43250393015006000113650010001234561000001234|2|1|1|ABC";
const URL_B: &str = "https://dfe-portal.svrs.rs.gov.br/Dfe/QrCodeNFce?p=43250493015006000113650010009999991000009999|2|1|1|DEF";

struct FakeFetcher {
    pages: HashMap<String, String>,
}

impl FakeFetcher {
    fn new(pages: &[(&str, String)]) -> Self {
        Self {
            pages: pages.iter().map(|(u, p)| (u.to_string(), p.clone())).collect(),
        }
    }
}

impl ReceiptFetcher for FakeFetcher {
    async fn fetch(&self, url: &str) -> Result<String> {
        self.pages
            .get(url)
            .cloned()
            .ok_or_else(|| anyhow!("proxy returned 502 for {url}"))
    }
}

#[derive(Default)]
struct MemoryStore {
    rows: Mutex<Vec<PriceRecord>>,
    fail_on: Vec<String>,
}

impl MemoryStore {
    fn failing_on(products: &[&str]) -> Self {
        Self {
            rows: Mutex::new(Vec::new()),
            fail_on: products.iter().map(|p| p.to_string()).collect(),
        }
    }

    fn len(&self) -> usize {
        self.rows.lock().unwrap().len()
    }
}

impl PriceStore for MemoryStore {
    async fn list_all(&self) -> Result<Vec<PriceRecord>> {
        Ok(self.rows.lock().unwrap().clone())
    }

    async fn insert(&self, record: &NewPriceRecord) -> Result<PriceRecord> {
        if self.fail_on.iter().any(|p| record.product_name.contains(p.as_str())) {
            bail!("insert rejected for {}", record.product_name);
        }
        let mut rows = self.rows.lock().unwrap();
        let saved = record.clone().with_id((rows.len() + 1).to_string());
        rows.push(saved.clone());
        Ok(saved)
    }

    async fn delete_by_vendor_and_date(&self, vendor_name: &str, date: NaiveDate) -> Result<()> {
        self.rows
            .lock()
            .unwrap()
            .retain(|r| r.vendor_name != vendor_name || r.purchase_date != date);
        Ok(())
    }
}

#[derive(Default)]
struct MemoryCache {
    receipts: Vec<KnownReceipt>,
}

impl ReceiptCache for MemoryCache {
    fn load_known(&self) -> Result<Vec<KnownReceipt>> {
        Ok(self.receipts.clone())
    }

    fn append(&mut self, receipt: KnownReceipt) -> Result<()> {
        self.receipts.push(receipt);
        Ok(())
    }

    fn remove_vendor_date(&mut self, vendor: &str, date: NaiveDate) -> Result<usize> {
        let before = self.receipts.len();
        self.receipts
            .retain(|r| r.vendor != vendor || r.purchase_date != date);
        Ok(before - self.receipts.len())
    }
}

fn receipt_page(date: &str, items: &[(&str, &str)], key: Option<&str>) -> String {
    let rows: String = items
        .iter()
        .map(|(name, valor)| {
            format!(
                r#"<tr><td><span class="txtTit">{name}</span></td><td><span class="valor">{valor}</span></td></tr>"#
            )
        })
        .collect();
    let chave = key
        .map(|k| format!(r#"<span class="chave">{k}</span>"#))
        .unwrap_or_default();
    format!(
        r#"<html><body>
<div class="txtCenter"><div id="u20">COMPANHIA ZAFFARI</div> CNPJ: 93.015.006/0001-13</div>
<table id="tabResult">{rows}</table>
<div class="txtCenter">Emitida em {date} 10:00:00</div>
{chave}
</body></html>"#
    )
}

fn page_a() -> String {
    receipt_page(
        "14/03/2025",
        &[("DETERGENTE YPE", "2,99"), ("FILE PEITO FRANGO", "23,90"), ("LEITE", "5,49")],
        Some(KEY_A),
    )
}

fn ingestor(
    fetcher: FakeFetcher,
    store: MemoryStore,
) -> Ingestor<FakeFetcher, MemoryStore, MemoryCache> {
    Ingestor::new(fetcher, store, MemoryCache::default(), Classifier::default())
        .with_parser(NfceParser::with_today(NaiveDate::from_ymd_opt(2025, 6, 1).unwrap()))
}

#[tokio::test]
async fn test_ingest_stores_classified_records() {
    let mut ing = ingestor(FakeFetcher::new(&[(URL_A, page_a())]), MemoryStore::default());

    let outcome = ing.ingest(URL_A).await.unwrap();
    let receipt = match outcome {
        IngestOutcome::Stored(receipt) => receipt,
        other => panic!("expected Stored, got {other:?}"),
    };

    assert_eq!(receipt.receipt_id, KEY_A);
    assert_eq!(receipt.vendor, "COMPANHIA ZAFFARI");
    assert_eq!(receipt.purchase_date, NaiveDate::from_ymd_opt(2025, 3, 14).unwrap());
    let categories: Vec<Category> = receipt.records.iter().map(|r| r.category).collect();
    assert_eq!(categories, vec![Category::Cleaning, Category::Meat, Category::Other]);
    assert_eq!(ing.cache().load_known_ids().unwrap(), vec![KEY_A]);
}

#[tokio::test]
async fn test_same_receipt_twice_is_stored_once() {
    let mut ing = ingestor(FakeFetcher::new(&[(URL_A, page_a())]), MemoryStore::default());

    assert!(matches!(ing.ingest(URL_A).await.unwrap(), IngestOutcome::Stored(_)));
    let second = ing.ingest(URL_A).await.unwrap();
    assert_eq!(
        second,
        IngestOutcome::Duplicate {
            receipt_id: KEY_A.to_string(),
            vendor: "COMPANHIA ZAFFARI".to_string(),
        }
    );
    assert_eq!(ing.store().len(), 3);
    assert_eq!(ing.cache().load_known().unwrap().len(), 1);
}

#[tokio::test]
async fn test_legacy_portal_url_is_rewritten() {
    let legacy = URL_A.replace(
        "dfe-portal.svrs.rs.gov.br/Dfe/QrCodeNFce",
        "www.sefaz.rs.gov.br/NFCE/NFCE-COM.aspx",
    );
    let mut ing = ingestor(FakeFetcher::new(&[(URL_A, page_a())]), MemoryStore::default());
    assert!(matches!(ing.ingest(&legacy).await.unwrap(), IngestOutcome::Stored(_)));
}

#[tokio::test]
async fn test_receipt_id_falls_back_to_url_key() {
    let page = receipt_page("01/04/2025", &[("ARROZ", "20,00")], None);
    let mut ing = ingestor(FakeFetcher::new(&[(URL_B, page)]), MemoryStore::default());

    let IngestOutcome::Stored(receipt) = ing.ingest(URL_B).await.unwrap() else {
        panic!("expected Stored");
    };
    assert_eq!(receipt.receipt_id, "43250493015006000113650010009999991000009999");
}

#[tokio::test]
async fn test_partial_failure_is_reported_and_can_roll_back() {
    let mut ing = ingestor(
        FakeFetcher::new(&[(URL_A, page_a())]),
        MemoryStore::failing_on(&["FRANGO"]),
    );

    let outcome = ing.ingest(URL_A).await.unwrap();
    let (receipt, failed) = match outcome {
        IngestOutcome::Partial { receipt, failed } => (receipt, failed),
        other => panic!("expected Partial, got {other:?}"),
    };
    assert_eq!(receipt.records.len(), 2);
    assert_eq!(failed.len(), 1);
    assert_eq!(failed[0].record.product_name, "FILE PEITO FRANGO");
    assert!(failed[0].reason.contains("rejected"));

    // Not remembered, so a retry is possible
    assert!(ing.cache().load_known_ids().unwrap().is_empty());
    assert_eq!(ing.store().len(), 2);

    ing.rollback(&receipt.records).await.unwrap();
    assert_eq!(ing.store().len(), 0);
}

#[tokio::test]
async fn test_total_store_failure_is_an_error() {
    let mut ing = ingestor(
        FakeFetcher::new(&[(URL_A, page_a())]),
        MemoryStore::failing_on(&[""]),
    );

    let err = ing.ingest(URL_A).await.unwrap_err();
    match err {
        IngestError::Store { receipt_id, .. } => assert_eq!(receipt_id, KEY_A),
        other => panic!("expected Store error, got {other:?}"),
    }
    assert!(ing.cache().load_known_ids().unwrap().is_empty());
}

#[tokio::test]
async fn test_fetch_failure_is_an_error() {
    let mut ing = ingestor(FakeFetcher::new(&[]), MemoryStore::default());
    let err = ing.ingest(URL_A).await.unwrap_err();
    assert!(matches!(err, IngestError::Fetch { .. }), "got {err:?}");
    assert_eq!(ing.store().len(), 0);
}

#[tokio::test]
async fn test_unreadable_receipt_stores_sentinel() {
    let mut ing = ingestor(
        FakeFetcher::new(&[(URL_B, "<html>erro no portal</html>".to_string())]),
        MemoryStore::default(),
    );
    let IngestOutcome::Stored(receipt) = ing.ingest(URL_B).await.unwrap() else {
        panic!("expected Stored");
    };
    assert_eq!(receipt.records.len(), 1);
    assert_eq!(receipt.records[0].product_name, "unknown");
    assert_eq!(receipt.records[0].unit_price, 0.0);
    assert_eq!(receipt.vendor, "Estabelecimento Não Encontrado");
    assert_eq!(receipt.purchase_date, NaiveDate::from_ymd_opt(2025, 6, 1).unwrap());
}

#[tokio::test]
async fn test_shared_ingestor_serializes_concurrent_scans() {
    let shared = ingestor(FakeFetcher::new(&[(URL_A, page_a())]), MemoryStore::default()).shared();

    let first = {
        let ing = shared.clone();
        async move { ing.lock().await.ingest(URL_A).await }
    };
    let second = {
        let ing = shared.clone();
        async move { ing.lock().await.ingest(URL_A).await }
    };
    let (a, b) = tokio::join!(first, second);

    let outcomes = [a.unwrap(), b.unwrap()];
    let stored = outcomes.iter().filter(|o| matches!(o, IngestOutcome::Stored(_))).count();
    let dup = outcomes.iter().filter(|o| matches!(o, IngestOutcome::Duplicate { .. })).count();
    assert_eq!((stored, dup), (1, 1));
    assert_eq!(shared.lock().await.store().len(), 3);
}

#[tokio::test]
async fn test_remove_receipt_allows_rescan() {
    let mut ing = ingestor(FakeFetcher::new(&[(URL_A, page_a())]), MemoryStore::default());
    ing.ingest(URL_A).await.unwrap();

    let date = NaiveDate::from_ymd_opt(2025, 3, 14).unwrap();
    assert_eq!(ing.remove_receipt("COMPANHIA ZAFFARI", date).await.unwrap(), 1);
    assert_eq!(ing.store().len(), 0);
    assert!(matches!(ing.ingest(URL_A).await.unwrap(), IngestOutcome::Stored(_)));
}

#[tokio::test]
async fn test_remove_receipt_with_full_vendor_label() {
    let mut ing = ingestor(FakeFetcher::new(&[(URL_A, page_a())]), MemoryStore::default());
    ing.ingest(URL_A).await.unwrap();
    assert_eq!(ing.store().len(), 3);

    let date = NaiveDate::from_ymd_opt(2025, 3, 14).unwrap();
    let removed = ing
        .remove_receipt("COMPANHIA ZAFFARI CNPJ: 93.015.006/0001-13", date)
        .await
        .unwrap();
    assert_eq!(removed, 1);
    assert_eq!(ing.store().len(), 0, "store rows must go with the cache entry");

    match ing.ingest(URL_A).await.unwrap() {
        IngestOutcome::Stored(r) => assert_eq!(r.records.len(), 3),
        other => panic!("expected a fresh store, got {other:?}"),
    }
    assert_eq!(ing.store().len(), 3);
}

#[tokio::test]
async fn test_vendor_view_after_two_receipts() {
    let later = receipt_page(
        "14/04/2025",
        &[("FILE PEITO FRANGO", "26,29"), ("LEITE", "5,49")],
        None,
    );
    let mut ing = ingestor(
        FakeFetcher::new(&[(URL_A, page_a()), (URL_B, later)]),
        MemoryStore::default(),
    );
    ing.ingest(URL_A).await.unwrap();
    ing.ingest(URL_B).await.unwrap();

    let records = ing.store().list_all().await.unwrap();
    let view = vendor_comparison(&records, "COMPANHIA ZAFFARI CNPJ: 93.015.006/0001-13");
    let keys: Vec<&str> = view.iter().map(|s| s.key.as_str()).collect();
    assert_eq!(keys, vec!["DETERGENTE YPE", "FILE PEITO FRANGO", "LEITE"]);

    let frango = &view[1].entries;
    let delta = frango[1].delta.unwrap();
    assert!((delta.absolute - 2.39).abs() < 1e-9);
    assert!((delta.percent.unwrap() - 10.0).abs() < 1e-9);

    let leite = view[2].entries[1].delta.unwrap();
    assert_eq!(leite.absolute, 0.0);
}
