//! Line-item edits on a Stand By order.

use std::collections::BTreeSet;

use laundry_catalog::{LineItem, lines_total};
use laundry_core::{DomainError, DomainResult, Money, ServiceId};

use crate::order::Order;
use crate::payment::{PaymentStatus, derive_after_edit};
use crate::status::OrderStatus;

/// What an edit changes.
///
/// Every service id in the submitted lines is replaced: its existing line is
/// deleted and the submitted one inserted unless its quantity is zero.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EditPlan {
    pub replaced: Vec<ServiceId>,
    pub inserted: Vec<LineItem>,
    pub resulting_lines: Vec<LineItem>,
    pub new_total: Money,
    pub new_payment_status: PaymentStatus,
}

pub fn plan_edit(order: &Order, current: &[LineItem], submitted: &[LineItem]) -> DomainResult<EditPlan> {
    if order.status != OrderStatus::StandBy {
        return Err(DomainError::validation("can only edit orders in Stand By status"));
    }

    let mut seen = BTreeSet::new();
    for line in submitted {
        line.validate()?;
        if !seen.insert(line.service_id) {
            return Err(DomainError::validation(format!(
                "service {} appears more than once",
                line.service_id
            )));
        }
    }

    let replaced: Vec<ServiceId> = submitted.iter().map(|l| l.service_id).collect();
    let inserted: Vec<LineItem> = submitted.iter().copied().filter(|l| l.quantity > 0).collect();

    let resulting_lines: Vec<LineItem> = current
        .iter()
        .copied()
        .filter(|l| !seen.contains(&l.service_id))
        .chain(inserted.iter().copied())
        .collect();

    let new_total = lines_total(&resulting_lines)?;
    let new_payment_status =
        derive_after_edit(order.payment_status, order.total_amount, new_total, order.paid_amount);

    Ok(EditPlan {
        replaced,
        inserted,
        resulting_lines,
        new_total,
        new_payment_status,
    })
}

impl Order {
    pub fn apply_edit(&mut self, plan: &EditPlan) {
        self.total_amount = plan.new_total;
        self.payment_status = plan.new_payment_status;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::code::OrderCode;
    use crate::order::OrderSource;
    use chrono::Utc;
    use laundry_core::OrderId;
    use proptest::prelude::*;

    fn sid(v: i64) -> ServiceId {
        ServiceId::new(v)
    }

    fn line(service: i64, qty: i64, price: i64) -> LineItem {
        LineItem::new(sid(service), qty, Money::from_minor(price))
    }

    fn order(status: OrderStatus, total: i64, paid: i64, payment_status: PaymentStatus) -> Order {
        Order {
            order_id: OrderId::new(1),
            order_code: OrderCode::from_stored("ORD010124001"),
            customer_id: None,
            booking_id: None,
            guest_name: Some("Guest".into()),
            guest_phone: None,
            total_amount: Money::from_minor(total),
            paid_amount: Money::from_minor(paid),
            payment_type: "Cash".into(),
            payment_status,
            status,
            source: OrderSource::WalkIn,
            created_at: Utc::now(),
            completion_date: None,
        }
    }

    #[test]
    fn edit_outside_stand_by_is_rejected() {
        let o = order(OrderStatus::Processing, 100, 0, PaymentStatus::Unpaid);
        assert!(plan_edit(&o, &[], &[line(1, 1, 100)]).is_err());
    }

    #[test]
    fn replaces_submitted_services_and_keeps_the_rest() {
        let o = order(OrderStatus::StandBy, 80000, 80000, PaymentStatus::Paid);
        let current = [line(1, 2, 30000), line(2, 1, 20000)];
        let plan = plan_edit(&o, &current, &[line(1, 1, 30000)]).unwrap();
        assert_eq!(plan.replaced, vec![sid(1)]);
        assert_eq!(plan.new_total, Money::from_minor(50000));
        assert_eq!(plan.new_payment_status, PaymentStatus::Paid);
    }

    #[test]
    fn zero_quantity_removes_the_line() {
        let o = order(OrderStatus::StandBy, 50000, 0, PaymentStatus::Unpaid);
        let current = [line(1, 1, 30000), line(2, 1, 20000)];
        let plan = plan_edit(&o, &current, &[line(2, 0, 20000)]).unwrap();
        assert!(plan.inserted.is_empty());
        assert_eq!(plan.resulting_lines, vec![line(1, 1, 30000)]);
        assert_eq!(plan.new_total, Money::from_minor(30000));
    }

    #[test]
    fn growing_a_paid_order_makes_it_partial() {
        let o = order(OrderStatus::StandBy, 30000, 30000, PaymentStatus::Paid);
        let plan = plan_edit(&o, &[line(1, 1, 30000)], &[line(1, 2, 30000)]).unwrap();
        assert_eq!(plan.new_payment_status, PaymentStatus::Partial);
    }

    #[test]
    fn duplicate_or_negative_lines_are_rejected() {
        let o = order(OrderStatus::StandBy, 0, 0, PaymentStatus::Unpaid);
        assert!(plan_edit(&o, &[], &[line(1, 1, 100), line(1, 2, 100)]).is_err());
        assert!(plan_edit(&o, &[], &[line(1, -1, 100)]).is_err());
    }

    proptest! {
        #[test]
        fn new_total_matches_resulting_lines(
            current in prop::collection::btree_map(1i64..20, (1i64..5, 0i64..10_000), 0..6),
            submitted in prop::collection::btree_map(1i64..20, (0i64..5, 0i64..10_000), 0..6),
        ) {
            let current: Vec<LineItem> = current.into_iter().map(|(s, (q, p))| line(s, q, p)).collect();
            let submitted: Vec<LineItem> = submitted.into_iter().map(|(s, (q, p))| line(s, q, p)).collect();
            let o = order(OrderStatus::StandBy, lines_total(&current).unwrap().minor(), 0, PaymentStatus::Unpaid);
            let plan = plan_edit(&o, &current, &submitted).unwrap();
            prop_assert_eq!(plan.new_total, lines_total(&plan.resulting_lines).unwrap());
            prop_assert!(plan.resulting_lines.iter().all(|l| l.quantity > 0));
        }
    }
}
