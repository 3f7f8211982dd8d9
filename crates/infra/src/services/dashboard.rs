//! Read-only aggregates for the agency and admin dashboards.
//!
//! A sale is one agency line in a delivered order, dated by its delivery.

use std::collections::{BTreeMap, HashMap};

use chrono::{DateTime, Datelike, Duration, Months, NaiveDate, Utc};
use serde::Serialize;

use setu_auth::Role;
use setu_catalog::{Category, Product, ProductStatus};
use setu_core::UserId;
use setu_orders::OrderStatus;

use super::{ServiceContext, newest_first};
use crate::error::ServiceResult;
use crate::store::MarketStore;

/// How many pending listings each admin preview carries.
pub const PENDING_PREVIEW: usize = 5;
const SALES_WINDOW_MONTHS: u32 = 6;
const ACTIVITY_WINDOW_DAYS: i64 = 7;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct CategoryCount {
    pub category: Category,
    pub count: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct MonthlySales {
    pub year: i32,
    pub month: u32,
    pub revenue: u64,
    pub count: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AgencyOverview {
    pub total_products: usize,
    pub approved_products: usize,
    pub pending_products: usize,
    pub sold_products: usize,
    pub total_revenue: u64,
    pub total_sales: usize,
    pub total_views: u64,
    /// Sales per hundred views, two decimals; zero without views.
    pub conversion_rate: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AgencyAnalytics {
    pub overview: AgencyOverview,
    /// Oldest month first.
    pub monthly_sales: Vec<MonthlySales>,
    /// Approved listings only.
    pub category_breakdown: Vec<CategoryCount>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct ProductOverview {
    pub total_products: usize,
    pub pending_products: usize,
    pub approved_products: usize,
    pub rejected_products: usize,
    pub sold_products: usize,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct UserCounts {
    pub total_agencies: usize,
    pub total_customers: usize,
    /// Agencies plus customers; admins are not counted.
    pub total_users: usize,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ActivityCount {
    pub date: NaiveDate,
    pub status: ProductStatus,
    pub count: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AdminDashboard {
    pub overview: ProductOverview,
    pub users: UserCounts,
    pub recent_pending: Vec<Product>,
    pub oldest_pending: Vec<Product>,
    /// Every listing, most common category first.
    pub category_breakdown: Vec<CategoryCount>,
    /// Listings created in the last week, by creation day and current status.
    pub recent_activity: Vec<ActivityCount>,
}

pub struct Dashboards<S, B> {
    ctx: ServiceContext<S, B>,
}

impl<S, B> Dashboards<S, B> {
    pub fn new(ctx: ServiceContext<S, B>) -> Self {
        Self { ctx }
    }
}

impl<S, B> Dashboards<S, B>
where
    S: MarketStore,
{
    pub fn agency_analytics(&self, agency: UserId) -> ServiceResult<AgencyAnalytics> {
        self.agency_analytics_at(agency, Utc::now())
    }

    pub fn admin_dashboard(&self) -> ServiceResult<AdminDashboard> {
        self.admin_dashboard_at(Utc::now())
    }

    fn agency_analytics_at(&self, agency: UserId, now: DateTime<Utc>) -> ServiceResult<AgencyAnalytics> {
        let store = self.ctx.store();
        let products = store.find_products(&|p| p.agency() == agency)?;
        let delivered = store.find_orders(&|o| {
            o.status() == OrderStatus::Delivered && o.involves_agency(agency)
        })?;

        let count = |status: ProductStatus| products.iter().filter(|p| p.status() == status).count();
        let total_views = products.iter().fold(0u64, |acc, p| acc.saturating_add(p.views()));

        let window_start = now
            .checked_sub_months(Months::new(SALES_WINDOW_MONTHS))
            .unwrap_or(DateTime::<Utc>::MIN_UTC);
        let mut total_revenue = 0u64;
        let mut total_sales = 0usize;
        let mut months: BTreeMap<(i32, u32), MonthlySales> = BTreeMap::new();
        for order in &delivered {
            let delivered_at = order.delivered_at().or(order.created_at());
            for item in order.items().iter().filter(|item| item.agency == agency) {
                let amount = item.line_total().unwrap_or(u64::MAX);
                total_revenue = total_revenue.saturating_add(amount);
                total_sales += 1;

                let Some(at) = delivered_at.filter(|at| *at >= window_start) else {
                    continue;
                };
                let key = (at.year(), at.month());
                let month = months.entry(key).or_insert(MonthlySales {
                    year: key.0,
                    month: key.1,
                    revenue: 0,
                    count: 0,
                });
                month.revenue = month.revenue.saturating_add(amount);
                month.count += 1;
            }
        }

        let approved: Vec<&Product> = products
            .iter()
            .filter(|p| p.status() == ProductStatus::Approved)
            .collect();

        Ok(AgencyAnalytics {
            overview: AgencyOverview {
                total_products: products.len(),
                approved_products: count(ProductStatus::Approved),
                pending_products: count(ProductStatus::Pending),
                sold_products: count(ProductStatus::Sold),
                total_revenue,
                total_sales,
                total_views,
                conversion_rate: conversion_rate(total_sales, total_views),
            },
            monthly_sales: months.into_values().collect(),
            category_breakdown: category_breakdown(approved.into_iter()),
        })
    }

    fn admin_dashboard_at(&self, now: DateTime<Utc>) -> ServiceResult<AdminDashboard> {
        let store = self.ctx.store();
        let products = store.find_products(&|_| true)?;
        let users = store.find_users(&|u| u.role != Role::Admin)?;

        let mut overview = ProductOverview {
            total_products: products.len(),
            ..ProductOverview::default()
        };
        for product in &products {
            match product.status() {
                ProductStatus::Pending => overview.pending_products += 1,
                ProductStatus::Approved => overview.approved_products += 1,
                ProductStatus::Rejected => overview.rejected_products += 1,
                ProductStatus::Sold => overview.sold_products += 1,
            }
        }

        let total_agencies = users.iter().filter(|u| u.role == Role::Agency).count();
        let total_customers = users.iter().filter(|u| u.role == Role::Customer).count();

        let mut pending: Vec<Product> = products
            .iter()
            .filter(|p| p.status() == ProductStatus::Pending)
            .cloned()
            .collect();
        newest_first(&mut pending, |p| (p.created_at(), p.id_typed()));
        let recent_pending: Vec<Product> = pending.iter().take(PENDING_PREVIEW).cloned().collect();
        let oldest_pending: Vec<Product> = pending.iter().rev().take(PENDING_PREVIEW).cloned().collect();

        let since = now - Duration::days(ACTIVITY_WINDOW_DAYS);
        let mut activity: BTreeMap<(NaiveDate, &'static str), ActivityCount> = BTreeMap::new();
        for product in &products {
            let Some(created) = product.created_at().filter(|at| *at >= since) else {
                continue;
            };
            let date = created.date_naive();
            activity
                .entry((date, product.status().as_str()))
                .or_insert(ActivityCount {
                    date,
                    status: product.status(),
                    count: 0,
                })
                .count += 1;
        }

        Ok(AdminDashboard {
            overview,
            users: UserCounts {
                total_agencies,
                total_customers,
                total_users: total_agencies + total_customers,
            },
            recent_pending,
            oldest_pending,
            category_breakdown: category_breakdown(products.iter()),
            recent_activity: activity.into_values().collect(),
        })
    }
}

/// Most common category first; ties by name.
fn category_breakdown<'a>(products: impl Iterator<Item = &'a Product>) -> Vec<CategoryCount> {
    let mut counts: HashMap<Category, usize> = HashMap::new();
    for product in products {
        *counts.entry(product.category()).or_insert(0) += 1;
    }
    let mut breakdown: Vec<CategoryCount> = counts
        .into_iter()
        .map(|(category, count)| CategoryCount { category, count })
        .collect();
    breakdown.sort_by(|a, b| {
        b.count
            .cmp(&a.count)
            .then_with(|| a.category.as_str().cmp(b.category.as_str()))
    });
    breakdown
}

fn conversion_rate(sales: usize, views: u64) -> f64 {
    if views == 0 {
        return 0.0;
    }
    let rate = sales as f64 / views as f64 * 100.0;
    (rate * 100.0).round() / 100.0
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn conversion_rate_is_rounded_to_two_decimals() {
        assert_eq!(conversion_rate(0, 0), 0.0);
        assert_eq!(conversion_rate(5, 0), 0.0);
        assert_eq!(conversion_rate(1, 3), 33.33);
        assert_eq!(conversion_rate(2, 8), 25.0);
    }
}
