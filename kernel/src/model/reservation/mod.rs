use crate::model::id::{EventId, ReservationId, UserId};
use chrono::{DateTime, Utc};
use shared::error::{AppError, AppResult};
use strum::{AsRefStr, EnumString};

pub mod event;

#[derive(Debug, Clone)]
pub struct Reservation {
    pub reservation_id: ReservationId,
    pub reserved_by: UserId,
    pub user_name: String,
    pub email: String,
    pub quantity: i32,
    pub status: ReservationStatus,
    pub created_at: DateTime<Utc>,
    pub event: ReservationEvent,
}

// 予約に埋め込むイベント側の射影
#[derive(Debug, Clone)]
pub struct ReservationEvent {
    pub event_id: EventId,
    pub title: String,
    pub location: String,
    pub event_date: DateTime<Utc>,
    pub capacity: i32,
}

// 予約の状態。
// pending → confirmed / refused、{pending, confirmed} → canceled のみ許す。
// refused と canceled からはどこへも遷移しない。
#[derive(Debug, Clone, Copy, PartialEq, Eq, AsRefStr, EnumString)]
#[strum(serialize_all = "lowercase")]
pub enum ReservationStatus {
    Pending,
    Confirmed,
    Refused,
    Canceled,
}

impl ReservationStatus {
    pub fn ensure_can_confirm(self) -> AppResult<()> {
        match self {
            ReservationStatus::Pending => Ok(()),
            _ => Err(AppError::UnprocessableEntity(
                "Only pending reservations can be confirmed".into(),
            )),
        }
    }

    pub fn ensure_can_refuse(self) -> AppResult<()> {
        match self {
            ReservationStatus::Pending => Ok(()),
            _ => Err(AppError::UnprocessableEntity(
                "Only pending reservations can be refused".into(),
            )),
        }
    }

    pub fn ensure_can_cancel(self) -> AppResult<()> {
        match self {
            ReservationStatus::Pending | ReservationStatus::Confirmed => Ok(()),
            ReservationStatus::Canceled => Err(AppError::UnprocessableEntity(
                "Reservation is already canceled".into(),
            )),
            ReservationStatus::Refused => Err(AppError::UnprocessableEntity(
                "A refused reservation cannot be canceled".into(),
            )),
        }
    }
}

/// 確定済み数量の合計 + 追加数量がイベントの定員を超えないことを確認する。
/// 超える場合は capacity-exceeded エラーを返す。
pub fn ensure_capacity_not_exceeded(
    capacity: i32,
    confirmed_sum: i64,
    quantity: i32,
) -> AppResult<()> {
    if confirmed_sum + i64::from(quantity) > i64::from(capacity) {
        return Err(AppError::CapacityExceeded(
            "Event capacity would be exceeded".into(),
        ));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case(ReservationStatus::Pending, true)]
    #[case(ReservationStatus::Confirmed, false)]
    #[case(ReservationStatus::Refused, false)]
    #[case(ReservationStatus::Canceled, false)]
    fn confirm_is_allowed_only_from_pending(#[case] status: ReservationStatus, #[case] ok: bool) {
        assert_eq!(status.ensure_can_confirm().is_ok(), ok);
    }

    #[rstest]
    #[case(ReservationStatus::Pending, true)]
    #[case(ReservationStatus::Confirmed, false)]
    #[case(ReservationStatus::Refused, false)]
    #[case(ReservationStatus::Canceled, false)]
    fn refuse_is_allowed_only_from_pending(#[case] status: ReservationStatus, #[case] ok: bool) {
        assert_eq!(status.ensure_can_refuse().is_ok(), ok);
    }

    #[rstest]
    #[case(ReservationStatus::Pending, true)]
    #[case(ReservationStatus::Confirmed, true)]
    #[case(ReservationStatus::Refused, false)]
    #[case(ReservationStatus::Canceled, false)]
    fn cancel_leaves_only_pending_or_confirmed(#[case] status: ReservationStatus, #[case] ok: bool) {
        assert_eq!(status.ensure_can_cancel().is_ok(), ok);
    }

    // 2 回目のキャンセルは no-op ではなくエラーになる
    #[test]
    fn second_cancel_is_rejected() {
        let err = ReservationStatus::Canceled.ensure_can_cancel().unwrap_err();
        assert_eq!(err.to_string(), "Reservation is already canceled");
    }

    #[rstest]
    // 空きちょうどまでは埋められる
    #[case(2, 0, 2, true)]
    #[case(10, 9, 1, true)]
    // 1 でも超えたら失敗
    #[case(2, 2, 1, false)]
    #[case(10, 9, 2, false)]
    #[case(1, 0, 2, false)]
    fn capacity_check_is_inclusive_of_the_boundary(
        #[case] capacity: i32,
        #[case] confirmed_sum: i64,
        #[case] quantity: i32,
        #[case] ok: bool,
    ) {
        assert_eq!(
            ensure_capacity_not_exceeded(capacity, confirmed_sum, quantity).is_ok(),
            ok
        );
    }

    #[test]
    fn status_round_trips_through_storage_form() {
        for status in [
            ReservationStatus::Pending,
            ReservationStatus::Confirmed,
            ReservationStatus::Refused,
            ReservationStatus::Canceled,
        ] {
            let parsed: ReservationStatus = status.as_ref().parse().unwrap();
            assert_eq!(parsed, status);
        }
    }
}
