//! Aggregate metrics over stored events.
//!
//! Counts are taken over whatever slice of records the caller fetched; the
//! Metrics Cache decides the window.

use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};

use crate::stored::EventRecord;

/// Funnel steps in order.
pub const FUNNEL_STEPS: [&str; 4] = ["view_item", "add_to_cart", "begin_checkout", "purchase"];

const TOP_PAGES: usize = 10;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EcommerceMetrics {
    pub cart_additions: u64,
    pub cart_removals: u64,
    pub checkout_starts: u64,
    pub checkout_completions: u64,
    pub product_views: u64,
    pub category_views: u64,
    pub search_queries: u64,
    /// Completions per checkout start, percent
    pub conversion_rate: f64,
    pub cart_abandonment_rate: f64,
    pub product_to_cart_rate: f64,
    pub average_order_value: f64,
    pub total_revenue: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PageViews {
    pub page: String,
    pub views: u64,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EngagementMetrics {
    pub unique_sessions: u64,
    pub unique_users: u64,
    pub average_events_per_session: f64,
    /// Seconds between first and last event, averaged over sessions
    pub average_session_duration: i64,
    /// Sessions with a single event, percent
    pub bounce_rate: f64,
    pub page_views: u64,
    pub top_pages: Vec<PageViews>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FunnelStep {
    pub step: String,
    /// Distinct sessions reaching this step
    pub sessions: u64,
    /// Share of this step's sessions reaching the next step
    pub conversion_rate: f64,
    pub drop_off_rate: f64,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FunnelAnalysis {
    pub steps: Vec<FunnelStep>,
    /// Purchasing sessions per viewing session, percent
    pub total_conversion_rate: f64,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AnalyticsMetrics {
    pub total_events: u64,
    pub ecommerce: EcommerceMetrics,
    pub engagement: EngagementMetrics,
    pub funnel: FunnelAnalysis,
}

fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

fn percent(part: u64, whole: u64) -> f64 {
    if whole == 0 {
        return 0.0;
    }
    part as f64 / whole as f64 * 100.0
}

fn is_commerce(r: &EventRecord) -> bool {
    r.category == "shop" || r.category == "ecommerce"
}

fn is_cart_add(r: &EventRecord) -> bool {
    r.action == "add_to_cart" || r.action == "add"
}

fn is_cart_remove(r: &EventRecord) -> bool {
    r.action == "remove_from_cart" || r.action == "remove"
}

fn is_checkout_start(r: &EventRecord) -> bool {
    r.action == "begin_checkout" || r.event_type == "begin_checkout"
}

fn is_purchase(r: &EventRecord) -> bool {
    r.action == "purchase"
}

fn page_contains(r: &EventRecord, needle: &str) -> bool {
    r.page.as_deref().is_some_and(|p| p.contains(needle))
}

fn is_product_view(r: &EventRecord) -> bool {
    r.action == "view_item" || page_contains(r, "/product/") || page_contains(r, "/buy/")
}

fn is_category_view(r: &EventRecord) -> bool {
    r.action == "view_category" || r.event_type == "view_category" || page_contains(r, "/category/")
}

fn is_search(r: &EventRecord) -> bool {
    (r.category == "search" && (r.action == "search" || r.action == "search_query"))
        || r.event_type == "search"
        || r.event_type == "search_query"
}

fn is_page_view(r: &EventRecord) -> bool {
    r.action == "view" || r.event_type == "page_view"
}

/// Computes every aggregate over `records`.
pub fn compute_metrics(records: &[EventRecord]) -> AnalyticsMetrics {
    AnalyticsMetrics {
        total_events: records.len() as u64,
        ecommerce: ecommerce_metrics(records),
        engagement: engagement_metrics(records),
        funnel: funnel_analysis(records),
    }
}

pub fn ecommerce_metrics(records: &[EventRecord]) -> EcommerceMetrics {
    let commerce: Vec<&EventRecord> = records.iter().filter(|r| is_commerce(r)).collect();
    let count = |pred: fn(&EventRecord) -> bool| commerce.iter().filter(|r| pred(r)).count() as u64;

    let cart_additions = count(is_cart_add);
    let cart_removals = count(is_cart_remove);
    let checkout_starts = count(|r| r.action == "begin_checkout");
    let checkout_completions = count(is_purchase);

    let product_views = records.iter().filter(|r| is_product_view(r)).count() as u64;
    let category_views = records.iter().filter(|r| is_category_view(r)).count() as u64;
    let search_queries = records.iter().filter(|r| is_search(r)).count() as u64;

    let total_revenue: f64 = commerce
        .iter()
        .filter(|r| is_purchase(r))
        .map(|r| r.event.value.unwrap_or(0.0))
        .sum();
    let average_order_value = if checkout_completions > 0 {
        total_revenue / checkout_completions as f64
    } else {
        0.0
    };

    let abandonment = if cart_additions > 0 {
        (cart_additions as f64 - checkout_completions as f64) / cart_additions as f64 * 100.0
    } else {
        0.0
    };

    EcommerceMetrics {
        cart_additions,
        cart_removals,
        checkout_starts,
        checkout_completions,
        product_views,
        category_views,
        search_queries,
        conversion_rate: round2(percent(checkout_completions, checkout_starts)),
        cart_abandonment_rate: round2(abandonment),
        product_to_cart_rate: round2(percent(cart_additions, product_views)),
        average_order_value: round2(average_order_value),
        total_revenue,
    }
}

pub fn engagement_metrics(records: &[EventRecord]) -> EngagementMetrics {
    // session -> (first, last, count)
    let mut sessions: HashMap<&str, (i64, i64, u64)> = HashMap::new();
    let mut users: HashSet<&str> = HashSet::new();
    let mut pages: HashMap<&str, u64> = HashMap::new();
    let mut page_views = 0;

    for record in records {
        let event = &record.event;
        if let Some(session) = event.session_hash.as_deref() {
            let entry = sessions
                .entry(session)
                .or_insert((event.created_at, event.created_at, 0));
            entry.0 = entry.0.min(event.created_at);
            entry.1 = entry.1.max(event.created_at);
            entry.2 += 1;
        }
        if let Some(user) = event.user_id.as_deref().or(event.visitor_hash.as_deref()) {
            users.insert(user);
        }
        if is_page_view(record) {
            page_views += 1;
            *pages.entry(record.page.as_deref().unwrap_or("unknown")).or_default() += 1;
        }
    }

    let unique_sessions = sessions.len() as u64;
    let (average_events_per_session, average_session_duration, bounce_rate) = if unique_sessions > 0
    {
        let total_duration: i64 = sessions.values().map(|(first, last, _)| last - first).sum();
        let bounces = sessions.values().filter(|(_, _, n)| *n == 1).count() as u64;
        (
            round2(records.len() as f64 / unique_sessions as f64),
            total_duration / unique_sessions as i64,
            round2(percent(bounces, unique_sessions)),
        )
    } else {
        (0.0, 0, 0.0)
    };

    let mut top_pages: Vec<PageViews> = pages
        .into_iter()
        .map(|(page, views)| PageViews {
            page: page.to_string(),
            views,
        })
        .collect();
    top_pages.sort_by(|a, b| b.views.cmp(&a.views).then_with(|| a.page.cmp(&b.page)));
    top_pages.truncate(TOP_PAGES);

    EngagementMetrics {
        unique_sessions,
        unique_users: users.len() as u64,
        average_events_per_session,
        average_session_duration,
        bounce_rate,
        page_views,
        top_pages,
    }
}

/// Funnel counted by distinct session at each step.
pub fn funnel_analysis(records: &[EventRecord]) -> FunnelAnalysis {
    let mut reached: [HashSet<&str>; 4] = Default::default();

    for record in records {
        let Some(session) = record.event.session_hash.as_deref() else {
            continue;
        };
        if is_product_view(record) || record.event.product_id.is_some() {
            reached[0].insert(session);
        }
        if is_cart_add(record) {
            reached[1].insert(session);
        }
        if is_checkout_start(record) {
            reached[2].insert(session);
        }
        if is_purchase(record) && record.event_type == "purchase" {
            reached[3].insert(session);
        }
    }

    let counts: Vec<u64> = reached.iter().map(|s| s.len() as u64).collect();
    let steps = FUNNEL_STEPS
        .iter()
        .enumerate()
        .map(|(i, step)| {
            let (conversion_rate, drop_off_rate) = match counts.get(i + 1) {
                Some(&next) => (
                    round2(percent(next, counts[i]).min(100.0)),
                    round2(percent(counts[i].saturating_sub(next), counts[i]).min(100.0)),
                ),
                None => (100.0, 0.0),
            };
            FunnelStep {
                step: step.to_string(),
                sessions: counts[i],
                conversion_rate,
                drop_off_rate,
            }
        })
        .collect();

    FunnelAnalysis {
        steps,
        total_conversion_rate: round2(percent(counts[3], counts[0]).min(100.0)),
    }
}
