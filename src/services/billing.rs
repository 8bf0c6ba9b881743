use crate::database::catalog::{NewSubscription, SubscriptionFilter};
use crate::database::manager::DatabaseError;
use crate::database::models::Subscription;
use crate::database::postgres::PgStore;
use crate::error::ApiError;

pub const FIRST_ORDER_NUMBER: u64 = 1001;

/// Attempts before a concurrent order number collision is reported
const ORDER_NUMBER_ATTEMPTS: usize = 3;

/// Order numbers count up from the last one issued
pub fn next_order_number(last: Option<&str>) -> Result<String, ApiError> {
    match last.and_then(|n| n.trim().parse::<u64>().ok()) {
        Some(n) => n
            .checked_add(1)
            .map(|next| next.to_string())
            .ok_or_else(|| ApiError::internal_server_error("Order numbers are exhausted")),
        None => {
            if let Some(bad) = last {
                tracing::warn!("Last order number '{}' is not numeric; restarting at {}", bad, FIRST_ORDER_NUMBER);
            }
            Ok(FIRST_ORDER_NUMBER.to_string())
        }
    }
}

/// Insert with the next order number. `order_number` is unique, so a
/// concurrent create that took the same number makes this one retry.
pub async fn create_subscription(db: &PgStore, request: &NewSubscription) -> Result<Subscription, ApiError> {
    if request.end_date < request.start_date {
        return Err(ApiError::bad_request("end_date must not be before start_date"));
    }

    let mut attempt = 1;
    loop {
        let order_number = next_order_number(db.last_order_number().await?.as_deref())?;
        match db.insert_subscription(request, &order_number).await {
            Ok(subscription) => {
                tracing::info!("Created subscription {} for user {}", subscription.order_number, subscription.user_id);
                return Ok(subscription);
            }
            Err(DatabaseError::Conflict(msg)) if attempt < ORDER_NUMBER_ATTEMPTS => {
                tracing::warn!("Order number {} taken concurrently ({}); retrying", order_number, msg);
                attempt += 1;
            }
            Err(e) => return Err(e.into()),
        }
    }
}

/// Staff see everything; everyone else only their own subscriptions
pub fn scope_filter(mut filter: SubscriptionFilter, user_id: i64, is_staff: bool) -> SubscriptionFilter {
    if !is_staff {
        filter.user_id = Some(user_id);
    }
    filter
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn order_numbers_start_at_1001_and_increment() {
        assert_eq!(next_order_number(None).unwrap(), "1001");
        assert_eq!(next_order_number(Some("1001")).unwrap(), "1002");
        assert_eq!(next_order_number(Some("abc")).unwrap(), "1001");
    }

    #[test]
    fn exhausted_order_numbers_are_an_error() {
        let err = next_order_number(Some(&u64::MAX.to_string())).unwrap_err();
        assert_eq!(err.status_code(), 500);
        assert_eq!(next_order_number(Some(&(u64::MAX - 1).to_string())).unwrap(), u64::MAX.to_string());
    }

    #[test]
    fn non_staff_are_scoped_to_themselves() {
        let scoped = scope_filter(SubscriptionFilter::default(), 7, false);
        assert_eq!(scoped.user_id, Some(7));
        let staff = scope_filter(SubscriptionFilter::default(), 7, true);
        assert_eq!(staff.user_id, None);
    }
}
