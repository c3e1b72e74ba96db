use std::collections::HashMap;

use async_trait::async_trait;

use stockwatch_core::alert::Alert;
use stockwatch_core::ids::{AlertId, ProductId};
use stockwatch_core::product::StockStatus;
use stockwatch_ports::inbound::AlertQueries;
use stockwatch_ports::outbound::{AlertRepository, ProductRepository};
use stockwatch_ports::types::{AlertFilter, AlertPage, AlertProductView};

use crate::error::AppError;

const DEFAULT_PER_PAGE: u32 = 50;

/// Export column order is a compatibility contract with downstream
/// consumers; do not reorder.
const CSV_HEADER: &str = "code,name,status,current_stock,critical_threshold,low_threshold,value";

pub struct AlertQueryService<A, P>
where
    A: AlertRepository,
    P: ProductRepository,
{
    alerts: A,
    products: P,
}

impl<A, P> AlertQueryService<A, P>
where
    A: AlertRepository,
    P: ProductRepository,
{
    pub fn new(alerts: A, products: P) -> Self {
        Self { alerts, products }
    }

    async fn join_products(
        &self,
        alerts: Vec<Alert>,
    ) -> Result<Vec<AlertProductView>, AppError> {
        let ids: Vec<ProductId> = alerts.iter().map(|a| a.product_id().clone()).collect();
        let products = self.products.find_by_ids(&ids).await?;
        let by_id: HashMap<_, _> = products.iter().map(|p| (p.id.clone(), p)).collect();

        Ok(alerts
            .into_iter()
            .map(|alert| match by_id.get(alert.product_id()) {
                Some(product) => AlertProductView {
                    stock_status: product.stock_status(),
                    current_stock: product.quantity,
                    critical_threshold: product.critical_threshold,
                    low_threshold: product.low_threshold,
                    stock_value: product.stock_value(),
                    alert,
                },
                None => {
                    // Product deleted since the alert fired; fall back to
                    // the quantity frozen on the alert.
                    let quantity = alert.current_quantity();
                    AlertProductView {
                        stock_status: if quantity == 0 {
                            StockStatus::Rupture
                        } else {
                            StockStatus::Ok
                        },
                        current_stock: quantity,
                        critical_threshold: 0,
                        low_threshold: 0,
                        stock_value: 0.0,
                        alert,
                    }
                }
            })
            .collect())
    }
}

fn normalize(mut filter: AlertFilter) -> AlertFilter {
    if filter.page == 0 {
        filter.page = 1;
    }
    if filter.per_page == 0 {
        filter.per_page = DEFAULT_PER_PAGE;
    }
    filter
}

fn csv_field(value: &str) -> String {
    if value.contains(',') || value.contains('"') || value.contains('\n') {
        format!("\"{}\"", value.replace('"', "\"\""))
    } else {
        value.to_string()
    }
}

#[async_trait]
impl<A, P> AlertQueries for AlertQueryService<A, P>
where
    A: AlertRepository,
    P: ProductRepository,
{
    type Error = AppError;

    async fn get_alert(&self, alert_id: &AlertId) -> Result<Alert, AppError> {
        self.alerts
            .find_by_id(alert_id)
            .await?
            .ok_or_else(AppError::not_found)
    }

    async fn query(&self, filter: AlertFilter) -> Result<AlertPage, AppError> {
        let filter = normalize(filter);
        let alerts = self.alerts.find_page(&filter).await?;
        // count and metrics run against the same predicate, over the
        // full filtered set rather than the page
        let total_count = self.alerts.count(&filter).await?;
        let metrics = self.alerts.metrics(&filter).await?;
        let items = self.join_products(alerts).await?;
        let total_pages = total_count.div_ceil(u64::from(filter.per_page)) as u32;
        Ok(AlertPage {
            items,
            total_count,
            total_pages,
            metrics,
        })
    }

    async fn export_csv(&self, filter: AlertFilter) -> Result<String, AppError> {
        let filter = AlertFilter {
            page: 1,
            per_page: u32::MAX,
            ..filter
        };
        let alerts = self.alerts.find_page(&filter).await?;
        let items = self.join_products(alerts).await?;

        let mut out = String::from(CSV_HEADER);
        out.push('\n');
        for view in &items {
            out.push_str(&format!(
                "{},{},{},{},{},{},{:.2}\n",
                csv_field(view.alert.product_code()),
                csv_field(view.alert.product_name()),
                view.stock_status.as_str(),
                view.current_stock,
                view.critical_threshold,
                view.low_threshold,
                view.stock_value,
            ));
        }
        Ok(out)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use chrono::{DateTime, Utc};
    use std::collections::{BTreeMap, BTreeSet};
    use std::sync::Mutex;
    use stockwatch_core::alert::{Status, Urgency};
    use stockwatch_core::channel::Channel;
    use stockwatch_core::ids::RuleId;
    use stockwatch_core::product::ProductRecord;
    use stockwatch_core::rule::{Operator, Priority, RuleSnapshot, RuleType};
    use stockwatch_ports::error::PortError;
    use stockwatch_ports::types::StockMetrics;

    /// Filtering mock that mirrors the SQL predicate: count, metrics and
    /// find_page all share `matches`.
    struct MockAlertRepo {
        alerts: Mutex<Vec<Alert>>,
        products: Vec<ProductRecord>,
    }

    impl MockAlertRepo {
        fn new(products: Vec<ProductRecord>) -> Self {
            Self {
                alerts: Mutex::new(vec![]),
                products,
            }
        }

        fn matches(filter: &AlertFilter, alert: &Alert) -> bool {
            if let Some(status) = filter.status {
                if alert.status() != status {
                    return false;
                }
            }
            if let Some(rule_type) = filter.rule_type {
                if alert.rule().rule_type != rule_type {
                    return false;
                }
            }
            if let Some(search) = &filter.search {
                let needle = search.to_lowercase();
                if !alert.product_name().to_lowercase().contains(&needle)
                    && !alert.product_code().to_lowercase().contains(&needle)
                    && !alert.message().to_lowercase().contains(&needle)
                {
                    return false;
                }
            }
            true
        }
    }

    #[async_trait]
    impl AlertRepository for MockAlertRepo {
        async fn save(&self, alert: &Alert) -> Result<(), PortError> {
            self.alerts.lock().unwrap().push(alert.clone());
            Ok(())
        }
        async fn find_by_id(&self, id: &AlertId) -> Result<Option<Alert>, PortError> {
            Ok(self
                .alerts
                .lock()
                .unwrap()
                .iter()
                .find(|a| a.id() == id)
                .cloned())
        }
        async fn find_active_for_pair(
            &self,
            _product_id: &ProductId,
            _rule_id: &RuleId,
        ) -> Result<Option<Alert>, PortError> {
            Ok(None)
        }
        async fn latest_resolution(
            &self,
            _product_id: &ProductId,
            _rule_type: RuleType,
        ) -> Result<Option<DateTime<Utc>>, PortError> {
            Ok(None)
        }
        async fn find_page(&self, filter: &AlertFilter) -> Result<Vec<Alert>, PortError> {
            let offset = (filter.page.saturating_sub(1) as usize)
                .saturating_mul(filter.per_page as usize);
            Ok(self
                .alerts
                .lock()
                .unwrap()
                .iter()
                .filter(|a| Self::matches(filter, a))
                .skip(offset)
                .take(filter.per_page as usize)
                .cloned()
                .collect())
        }
        async fn count(&self, filter: &AlertFilter) -> Result<u64, PortError> {
            Ok(self
                .alerts
                .lock()
                .unwrap()
                .iter()
                .filter(|a| Self::matches(filter, a))
                .count() as u64)
        }
        async fn metrics(&self, filter: &AlertFilter) -> Result<StockMetrics, PortError> {
            let mut metrics = StockMetrics::default();
            for alert in self
                .alerts
                .lock()
                .unwrap()
                .iter()
                .filter(|a| Self::matches(filter, a))
            {
                let Some(product) = self.products.iter().find(|p| &p.id == alert.product_id())
                else {
                    continue;
                };
                match product.stock_status() {
                    stockwatch_core::product::StockStatus::Rupture => metrics.rupture_items += 1,
                    stockwatch_core::product::StockStatus::Critical => metrics.critical_items += 1,
                    stockwatch_core::product::StockStatus::Low => metrics.low_items += 1,
                    stockwatch_core::product::StockStatus::Ok => {}
                }
            }
            Ok(metrics)
        }
        async fn purge_resolved_before(&self, _cutoff: DateTime<Utc>) -> Result<u64, PortError> {
            Ok(0)
        }
    }

    struct MockProductRepo {
        products: Vec<ProductRecord>,
    }

    #[async_trait]
    impl ProductRepository for MockProductRepo {
        async fn list_all(&self) -> Result<Vec<ProductRecord>, PortError> {
            Ok(self.products.clone())
        }
        async fn find_by_ids(&self, ids: &[ProductId]) -> Result<Vec<ProductRecord>, PortError> {
            Ok(self
                .products
                .iter()
                .filter(|p| ids.contains(&p.id))
                .cloned()
                .collect())
        }
    }

    fn now() -> DateTime<Utc> {
        chrono::DateTime::parse_from_rfc3339("2025-06-01T10:00:00Z")
            .unwrap()
            .with_timezone(&Utc)
    }

    fn make_product(code: &str, name: &str, quantity: i64) -> ProductRecord {
        ProductRecord {
            id: ProductId::new(),
            code: code.into(),
            name: name.into(),
            quantity,
            unit_price: 2.5,
            critical_threshold: 5,
            low_threshold: 15,
            expiry_date: None,
            monthly_rotation: None,
        }
    }

    fn make_alert(product: &ProductRecord, rule_type: RuleType) -> Alert {
        let snapshot = RuleSnapshot {
            rule_id: RuleId::new(),
            rule_name: "rule".into(),
            rule_type,
            threshold_value: 10.0,
            threshold_operator: Operator::Lt,
            priority: Priority::High,
            notification_channels: BTreeSet::from([Channel::Dashboard]),
            recipients: BTreeMap::new(),
        };
        let (alert, _) = Alert::new(
            snapshot,
            product.id.clone(),
            product.code.clone(),
            product.name.clone(),
            format!("alert for {}", product.name),
            product.quantity,
            None,
            Urgency::High,
            now(),
        );
        alert
    }

    async fn seeded_service() -> AlertQueryService<MockAlertRepo, MockProductRepo> {
        let p1 = make_product("PARA-500", "Paracetamol 500mg", 0);
        let p2 = make_product("IBU-200", "Ibuprofen 200mg", 3);
        let p3 = make_product("AMOX-1G", "Amoxicillin 1g", 10);
        let products = vec![p1.clone(), p2.clone(), p3.clone()];

        let repo = MockAlertRepo::new(products.clone());
        repo.save(&make_alert(&p1, RuleType::Stockout)).await.unwrap();
        repo.save(&make_alert(&p2, RuleType::StockLow)).await.unwrap();
        repo.save(&make_alert(&p3, RuleType::StockLow)).await.unwrap();

        AlertQueryService::new(repo, MockProductRepo { products })
    }

    #[tokio::test]
    async fn query_paginates_and_counts_full_set() {
        let svc = seeded_service().await;
        let page = svc
            .query(AlertFilter {
                page: 1,
                per_page: 2,
                ..Default::default()
            })
            .await
            .unwrap();

        assert_eq!(page.items.len(), 2);
        assert_eq!(page.total_count, 3);
        assert_eq!(page.total_pages, 2);
    }

    #[tokio::test]
    async fn total_count_equals_unpaginated_length() {
        let svc = seeded_service().await;
        let filter = AlertFilter {
            rule_type: Some(RuleType::StockLow),
            ..Default::default()
        };

        let page = svc
            .query(AlertFilter {
                page: 1,
                per_page: 1,
                ..filter.clone()
            })
            .await
            .unwrap();
        let all = svc
            .alerts
            .find_page(&AlertFilter {
                page: 1,
                per_page: u32::MAX,
                ..filter
            })
            .await
            .unwrap();

        assert_eq!(page.total_count, all.len() as u64);
    }

    #[tokio::test]
    async fn metrics_cover_full_filtered_set_not_page() {
        let svc = seeded_service().await;
        let page = svc
            .query(AlertFilter {
                page: 1,
                per_page: 1,
                ..Default::default()
            })
            .await
            .unwrap();

        // one product at 0 (rupture), one at 3 (critical), one at 10 (low)
        assert_eq!(
            page.metrics,
            StockMetrics {
                rupture_items: 1,
                critical_items: 1,
                low_items: 1,
            }
        );
    }

    #[tokio::test]
    async fn search_filter_narrows_results() {
        let svc = seeded_service().await;
        let page = svc
            .query(AlertFilter {
                search: Some("ibuprofen".into()),
                ..Default::default()
            })
            .await
            .unwrap();

        assert_eq!(page.total_count, 1);
        assert_eq!(page.items[0].alert.product_code(), "IBU-200");
    }

    #[tokio::test]
    async fn empty_result_is_ok_not_error() {
        let svc = seeded_service().await;
        let page = svc
            .query(AlertFilter {
                status: Some(Status::Treated),
                ..Default::default()
            })
            .await
            .unwrap();

        assert!(page.items.is_empty());
        assert_eq!(page.total_count, 0);
        assert_eq!(page.total_pages, 0);
    }

    #[tokio::test]
    async fn get_alert_unknown_id_is_not_found() {
        let svc = seeded_service().await;
        let result = svc.get_alert(&AlertId::new()).await;
        assert!(result.is_err_and(|e| e.is_not_found()));
    }

    #[tokio::test]
    async fn export_header_matches_contract_exactly() {
        let svc = seeded_service().await;
        let csv = svc.export_csv(AlertFilter::default()).await.unwrap();
        assert_eq!(
            csv.lines().next().unwrap(),
            "code,name,status,current_stock,critical_threshold,low_threshold,value"
        );
    }

    #[tokio::test]
    async fn export_row_count_matches_filtered_count() {
        let svc = seeded_service().await;
        let filter = AlertFilter {
            rule_type: Some(RuleType::StockLow),
            ..Default::default()
        };

        let csv = svc.export_csv(filter.clone()).await.unwrap();
        let count = svc.alerts.count(&filter).await.unwrap();

        assert_eq!(csv.lines().count() as u64, count + 1); // header row
    }

    #[tokio::test]
    async fn export_formats_value_and_status() {
        let svc = seeded_service().await;
        let csv = svc
            .export_csv(AlertFilter {
                search: Some("amox".into()),
                ..Default::default()
            })
            .await
            .unwrap();

        // quantity 10 at 2.50 each, stock status low
        assert_eq!(
            csv.lines().nth(1).unwrap(),
            "AMOX-1G,Amoxicillin 1g,low,10,5,15,25.00"
        );
    }

    #[tokio::test]
    async fn export_quotes_fields_with_commas() {
        let product = make_product("SIR-001", "Sirop toux, enfant", 8);
        let repo = MockAlertRepo::new(vec![product.clone()]);
        repo.save(&make_alert(&product, RuleType::StockLow)).await.unwrap();
        let svc = AlertQueryService::new(
            repo,
            MockProductRepo {
                products: vec![product],
            },
        );

        let csv = svc.export_csv(AlertFilter::default()).await.unwrap();

        assert!(csv.lines().nth(1).unwrap().contains("\"Sirop toux, enfant\""));
    }
}
