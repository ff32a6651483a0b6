//! Subscription matching for ingested events.
//!
//! A subscription matches an event when it is enabled, names the
//! event's type, satisfies every label selector, and points at an
//! http(s) endpoint. Matching is pure; the caller loads the candidate
//! set and schedules deliveries for the matches.

use std::collections::HashMap;

use fanout_core::models::{Event, LabelSelector, Subscription};

/// Filters `subscriptions` down to those matching `event`.
///
/// Preserves the input order, so deliveries are scheduled in catalog
/// order.
pub fn matching_subscriptions<'a>(
    subscriptions: &'a [Subscription],
    event: &Event,
) -> Vec<&'a Subscription> {
    subscriptions.iter().filter(|sub| matches(sub, event)).collect()
}

/// Tests one subscription against one event.
pub fn matches(subscription: &Subscription, event: &Event) -> bool {
    if !subscription.enabled {
        return false;
    }
    if !subscription.event_type_ids.iter().any(|t| t == &event.event_type) {
        return false;
    }
    if !labels_match(&subscription.labels, &event.labels) {
        return false;
    }
    // Anything else (ftp:, file:, an empty string) is silently skipped
    // rather than attempted and failed.
    let url = subscription.endpoint.url.as_str();
    url.starts_with("https://") || url.starts_with("http://")
}

/// Evaluates label selectors against an event's labels.
///
/// Every selector must be satisfied. A selector with an empty key is
/// ignored; a selector with an empty value degrades to a key-presence
/// check. An empty selector list matches everything.
fn labels_match(selectors: &[LabelSelector], labels: &HashMap<String, String>) -> bool {
    for selector in selectors {
        let key = selector.key.trim();
        if key.is_empty() {
            continue;
        }
        let Some(actual) = labels.get(key) else {
            return false;
        };
        if let Some(expected) = selector.value.as_deref() {
            let expected = expected.trim();
            if !expected.is_empty() && actual != expected {
                return false;
            }
        }
    }
    true
}

#[cfg(test)]
mod tests {
    use chrono::Utc;
    use fanout_core::models::{Endpoint, EventId, SubscriptionId, TenantId};

    use super::*;

    fn event_with_labels(event_type: &str, labels: &[(&str, &str)]) -> Event {
        Event {
            id: EventId::new("evt_1"),
            event_type: event_type.to_string(),
            occurred_at: Utc::now(),
            received_at: Utc::now(),
            labels: labels.iter().map(|(k, v)| (k.to_string(), v.to_string())).collect(),
            payload: serde_json::Value::Null,
        }
    }

    fn subscription(event_types: &[&str], labels: Vec<LabelSelector>, url: &str) -> Subscription {
        Subscription {
            id: SubscriptionId::new("sub-1"),
            tenant_id: TenantId::new("acme"),
            description: String::new(),
            enabled: true,
            event_type_ids: event_types.iter().map(|s| s.to_string()).collect(),
            labels,
            endpoint: Endpoint {
                method: "POST".to_string(),
                url: url.to_string(),
                headers: Vec::new(),
            },
            signing: Default::default(),
            delivery: Default::default(),
            last_delivery: None,
            failure_count: 0,
            created_at: None,
            updated_at: None,
        }
    }

    #[test]
    fn matches_on_event_type() {
        let event = event_with_labels("order.created", &[]);
        let sub = subscription(&["order.created"], Vec::new(), "https://example.com");
        assert!(matches(&sub, &event));

        let other = subscription(&["user.created"], Vec::new(), "https://example.com");
        assert!(!matches(&other, &event));
    }

    #[test]
    fn disabled_subscription_never_matches() {
        let event = event_with_labels("order.created", &[]);
        let mut sub = subscription(&["order.created"], Vec::new(), "https://example.com");
        sub.enabled = false;
        assert!(!matches(&sub, &event));
    }

    #[test]
    fn key_only_selector_requires_presence() {
        let sub = subscription(
            &["order.created"],
            vec![LabelSelector::key("region")],
            "https://example.com",
        );

        assert!(matches(&sub, &event_with_labels("order.created", &[("region", "SG")])));
        assert!(!matches(&sub, &event_with_labels("order.created", &[("env", "prod")])));
    }

    #[test]
    fn key_value_selector_requires_exact_match() {
        let sub = subscription(
            &["order.created"],
            vec![LabelSelector::key_value("region", "SG")],
            "https://example.com",
        );

        assert!(matches(&sub, &event_with_labels("order.created", &[("region", "SG")])));
        assert!(!matches(&sub, &event_with_labels("order.created", &[("region", "US")])));
    }

    #[test]
    fn all_selectors_must_hold() {
        let sub = subscription(
            &["order.created"],
            vec![LabelSelector::key_value("region", "SG"), LabelSelector::key("env")],
            "https://example.com",
        );

        assert!(matches(
            &sub,
            &event_with_labels("order.created", &[("region", "SG"), ("env", "prod")])
        ));
        assert!(!matches(&sub, &event_with_labels("order.created", &[("region", "SG")])));
    }

    #[test]
    fn empty_value_selector_degrades_to_presence_check() {
        let sub = subscription(
            &["order.created"],
            vec![LabelSelector::key_value("region", "")],
            "https://example.com",
        );

        assert!(matches(&sub, &event_with_labels("order.created", &[("region", "anything")])));
    }

    #[test]
    fn non_http_endpoints_are_skipped() {
        let event = event_with_labels("order.created", &[]);

        for url in ["ftp://example.com", "file:///tmp/x", ""] {
            let sub = subscription(&["order.created"], Vec::new(), url);
            assert!(!matches(&sub, &event), "should skip {url:?}");
        }

        let http = subscription(&["order.created"], Vec::new(), "http://example.com");
        assert!(matches(&http, &event));
    }

    #[test]
    fn filter_preserves_order() {
        let event = event_with_labels("order.created", &[]);
        let mut a = subscription(&["order.created"], Vec::new(), "https://a.example.com");
        a.id = SubscriptionId::new("sub-a");
        let b = subscription(&["user.created"], Vec::new(), "https://b.example.com");
        let mut c = subscription(&["order.created"], Vec::new(), "https://c.example.com");
        c.id = SubscriptionId::new("sub-c");

        let subs = vec![a, b, c];
        let matched = matching_subscriptions(&subs, &event);
        let ids: Vec<&str> = matched.iter().map(|s| s.id.as_str()).collect();
        assert_eq!(ids, vec!["sub-a", "sub-c"]);
    }
}
