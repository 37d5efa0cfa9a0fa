use axum::{
    extract::{Path, State},
    http::header,
    response::IntoResponse,
};
use chrono::{DateTime, Utc};
use kernel::model::{
    id::ReservationId,
    reservation::{Reservation, ReservationStatus},
};
use printpdf::{BuiltinFont, Mm, PdfDocument};
use registry::AppRegistry;
use shared::error::{AppError, AppResult};

use crate::extractor::AuthorizedUser;

pub async fn download_ticket(
    user: AuthorizedUser,
    Path(reservation_id): Path<ReservationId>,
    State(registry): State<AppRegistry>,
) -> AppResult<impl IntoResponse> {
    let reservation = registry
        .reservation_repository()
        .find_by_id(reservation_id)
        .await?
        .ok_or_else(|| AppError::EntityNotFound("Reservation not found".into()))?;

    if !user.is_admin() && reservation.reserved_by != user.id() {
        return Err(AppError::ForbiddenOperation(
            "You can only download tickets for your own reservations".into(),
        ));
    }

    let bytes = build_ticket(&reservation)?;

    let headers = [
        (header::CONTENT_TYPE, "application/pdf".to_string()),
        (
            header::CONTENT_DISPOSITION,
            format!("attachment; filename=ticket-{}.pdf", reservation_id),
        ),
    ];
    Ok((headers, bytes))
}

// 確定済み予約の入場チケットを A4 縦の PDF として組み立てる
fn build_ticket(reservation: &Reservation) -> AppResult<Vec<u8>> {
    if reservation.status != ReservationStatus::Confirmed {
        return Err(AppError::UnprocessableEntity(
            "PDF ticket can only be generated for confirmed reservations".into(),
        ));
    }

    let (doc, page, layer) = PdfDocument::new("Event Ticket", Mm(210.0), Mm(297.0), "Layer 1");
    let regular = doc
        .add_builtin_font(BuiltinFont::Helvetica)
        .map_err(|e| AppError::TicketRenderError(e.to_string()))?;
    let bold = doc
        .add_builtin_font(BuiltinFont::HelveticaBold)
        .map_err(|e| AppError::TicketRenderError(e.to_string()))?;

    let layer = doc.get_page(page).get_layer(layer);
    layer.use_text("Event Ticket", 24.0, Mm(20.0), Mm(270.0), &bold);
    layer.use_text(reservation.event.title.as_str(), 18.0, Mm(20.0), Mm(255.0), &bold);

    let lines = [
        format!("Date: {}", format_date(reservation.event.event_date)),
        format!("Location: {}", reservation.event.location),
        format!("Attendee: {}", reservation.user_name),
        format!("Email: {}", reservation.email),
        format!("Seats: {}", reservation.quantity),
        "Status: confirmed".to_string(),
        format!("Reservation ID: {}", reservation.reservation_id),
    ];
    let mut y = 240.0;
    for line in lines {
        layer.use_text(line, 12.0, Mm(20.0), Mm(y), &regular);
        y -= 8.0;
    }

    doc.save_to_bytes()
        .map_err(|e| AppError::TicketRenderError(e.to_string()))
}

fn format_date(date: DateTime<Utc>) -> String {
    date.format("%Y-%m-%d %H:%M UTC").to_string()
}

#[cfg(test)]
mod tests {
    use chrono::Utc;
    use kernel::model::{
        id::{EventId, UserId},
        reservation::ReservationEvent,
    };

    use super::*;

    fn fixture_reservation(status: ReservationStatus) -> Reservation {
        Reservation {
            reservation_id: ReservationId::new(),
            reserved_by: UserId::new(),
            user_name: "Taro".into(),
            email: "taro@example.com".into(),
            quantity: 2,
            status,
            created_at: Utc::now(),
            event: ReservationEvent {
                event_id: EventId::new(),
                title: "Rust Meetup".into(),
                location: "Tokyo".into(),
                event_date: Utc::now(),
                capacity: 30,
            },
        }
    }

    #[test]
    fn confirmed_reservation_renders_a_pdf() {
        let bytes = build_ticket(&fixture_reservation(ReservationStatus::Confirmed)).unwrap();
        assert!(bytes.starts_with(b"%PDF"));
    }

    #[test]
    fn pending_reservation_cannot_be_ticketed() {
        let result = build_ticket(&fixture_reservation(ReservationStatus::Pending));
        assert!(matches!(result, Err(AppError::UnprocessableEntity(_))));
    }
}
