use chrono::{DateTime, NaiveDate, SubsecRound, Utc};
use rusqlite::Connection;
use uuid::Uuid;

use crate::db::queries;
use crate::errors::AppError;
use crate::models::booking::non_blank;
use crate::models::{
    Booking, BookingFilter, BookingStatus, CreateBookingRequest, EventKind, ListBookingsQuery,
    PaymentStatus, UpdateBookingRequest,
};
use crate::services::catalog;

pub const DEFAULT_PAGE_SIZE: i64 = 50;
pub const MAX_PAGE_SIZE: i64 = 200;

/// Validates a submitted booking form and stores it as a new `pending`,
/// `unpaid` booking. Every field problem is reported in one error.
pub fn create_booking(conn: &Connection, request: CreateBookingRequest) -> Result<Booking, AppError> {
    let mut errors = vec![];

    let raw_event_type = non_blank(request.event_type);
    let event = match raw_event_type.as_deref() {
        None => {
            errors.push("eventType is required".to_string());
            None
        }
        Some(raw) => match EventKind::parse(raw) {
            Some(parsed) => Some(parsed),
            None => {
                errors.push(format!("eventType '{raw}' is not a known event type"));
                None
            }
        },
    };

    let date = match non_blank(request.date) {
        None => {
            errors.push("date is required".to_string());
            None
        }
        Some(raw) => match parse_event_date(&raw) {
            Some(date) => Some(date),
            None => {
                errors.push(format!("date '{raw}' is not a valid calendar date (YYYY-MM-DD)"));
                None
            }
        },
    };

    let client_name = non_blank(request.client_name);
    if client_name.is_none() {
        errors.push("clientName is required".to_string());
    }
    let contact_number = non_blank(request.contact_number);
    if contact_number.is_none() {
        errors.push("contactNumber is required".to_string());
    }

    if request.guest_count.is_some_and(|n| n < 0) {
        errors.push("guestCount must not be negative".to_string());
    }
    if request.budget.is_some_and(|b| !b.is_finite() || b < 0.0) {
        errors.push("budget must be a non-negative number".to_string());
    }

    let email = non_blank(request.email);
    if email.as_deref().is_some_and(|e| !e.contains('@')) {
        errors.push("email must be a valid email address".to_string());
    }

    let mut sub_type = None;
    if let Some((kind, implied)) = &event {
        match catalog::resolve_sub_type(conn, *kind, request.sub_type.as_deref(), implied.as_deref()) {
            Ok(resolved) => sub_type = resolved,
            Err(AppError::Validation(messages)) => {
                // "Wedding Car" reads as wedding + "car" but is really a
                // sub-type of another kind; point the client there instead.
                let owner = match (implied, raw_event_type.as_deref()) {
                    (Some(_), Some(raw)) => {
                        catalog::kind_offering(conn, raw)?.map(|found| (raw, found))
                    }
                    _ => None,
                };
                match owner {
                    Some((raw, (owner, spelled))) => errors.push(format!(
                        "eventType '{raw}' names a sub-type of {}; send eventType '{owner}' with subType '{spelled}'",
                        owner.catalog_name().unwrap_or(owner.as_str()),
                    )),
                    None => errors.extend(messages),
                }
            }
            Err(e) => return Err(e),
        }
    }

    let (Some((event_type, _)), Some(date), Some(client_name), Some(contact_number), true) =
        (event, date, client_name, contact_number, errors.is_empty())
    else {
        return Err(AppError::Validation(errors));
    };

    let now = Utc::now().trunc_subsecs(3);
    let booking = Booking {
        id: Uuid::new_v4().to_string(),
        user: non_blank(request.user),
        event_type,
        sub_type,
        date,
        time: non_blank(request.time),
        venue: request.venue.and_then(|v| v.normalized()),
        guest_count: request.guest_count,
        requirements: non_blank(request.requirements),
        budget: request.budget,
        status: BookingStatus::Pending,
        payment_status: PaymentStatus::Unpaid,
        client_name,
        contact_number,
        email,
        created_at: now,
        updated_at: now,
    };

    queries::insert_booking(conn, &booking)?;
    tracing::info!(
        booking_id = %booking.id,
        event_type = %booking.event_type,
        date = %booking.date,
        "booking created"
    );

    Ok(booking)
}

/// Accepts a plain date or an RFC 3339 timestamp, keeping only its date.
fn parse_event_date(raw: &str) -> Option<NaiveDate> {
    NaiveDate::parse_from_str(raw, "%Y-%m-%d")
        .ok()
        .or_else(|| DateTime::parse_from_rfc3339(raw).ok().map(|dt| dt.date_naive()))
}

pub fn get_booking(conn: &Connection, id: &str) -> Result<Booking, AppError> {
    queries::get_booking_by_id(conn, id)?
        .ok_or_else(|| AppError::NotFound(format!("booking {id}")))
}

pub fn list_bookings(conn: &Connection, query: ListBookingsQuery) -> Result<Vec<Booking>, AppError> {
    let filter = build_filter(query)?;
    Ok(queries::list_bookings(conn, &filter)?)
}

fn build_filter(query: ListBookingsQuery) -> Result<BookingFilter, AppError> {
    let mut errors = vec![];

    let (status, payment_status) =
        parse_lifecycle(query.status, query.payment_status, &mut errors);

    let mut date_param = |name: &str, value: Option<String>| {
        non_blank(value).and_then(|raw| {
            let parsed = parse_event_date(&raw);
            if parsed.is_none() {
                errors.push(format!("{name} '{raw}' is not a valid date (YYYY-MM-DD)"));
            }
            parsed
        })
    };
    let from = date_param("from", query.from);
    let to = date_param("to", query.to);

    if let (Some(from), Some(to)) = (from, to) {
        if from > to {
            errors.push("from must not be after to".to_string());
        }
    }
    if query.limit.is_some_and(|l| l < 1) {
        errors.push("limit must be at least 1".to_string());
    }
    if query.offset.is_some_and(|o| o < 0) {
        errors.push("offset must not be negative".to_string());
    }

    if !errors.is_empty() {
        return Err(AppError::Validation(errors));
    }

    Ok(BookingFilter {
        status,
        payment_status,
        from,
        to,
        limit: query.limit.unwrap_or(DEFAULT_PAGE_SIZE).min(MAX_PAGE_SIZE),
        offset: query.offset.unwrap_or(0),
    })
}

fn parse_lifecycle(
    status: Option<String>,
    payment_status: Option<String>,
    errors: &mut Vec<String>,
) -> (Option<BookingStatus>, Option<PaymentStatus>) {
    let status = non_blank(status).and_then(|raw| {
        let parsed = BookingStatus::parse(&raw);
        if parsed.is_none() {
            errors.push(format!("status '{raw}' is not a valid booking status"));
        }
        parsed
    });
    let payment_status = non_blank(payment_status).and_then(|raw| {
        let parsed = PaymentStatus::parse(&raw);
        if parsed.is_none() {
            errors.push(format!("paymentStatus '{raw}' is not a valid payment status"));
        }
        parsed
    });
    (status, payment_status)
}

/// Moves a booking through its status and payment lifecycle. Only those two
/// fields can change; everything else about a booking is fixed at intake.
pub fn update_booking(
    conn: &Connection,
    id: &str,
    request: UpdateBookingRequest,
) -> Result<Booking, AppError> {
    apply_update(conn, id, request, true)
}

/// Admin variant of [`update_booking`]: any status or payment value may be
/// set, e.g. to reopen a booking cancelled by mistake.
pub fn correct_booking(
    conn: &Connection,
    id: &str,
    request: UpdateBookingRequest,
) -> Result<Booking, AppError> {
    apply_update(conn, id, request, false)
}

fn apply_update(
    conn: &Connection,
    id: &str,
    request: UpdateBookingRequest,
    enforce_transitions: bool,
) -> Result<Booking, AppError> {
    let mut errors = vec![];

    let (status, payment_status) =
        parse_lifecycle(request.status, request.payment_status, &mut errors);

    if !errors.is_empty() {
        return Err(AppError::Validation(errors));
    }
    if status.is_none() && payment_status.is_none() {
        return Err(AppError::validation(
            "nothing to update: supply status and/or paymentStatus",
        ));
    }

    let current = get_booking(conn, id)?;
    let next_status = status.unwrap_or(current.status);
    let next_payment = payment_status.unwrap_or(current.payment_status);

    if enforce_transitions && !current.status.can_transition_to(next_status) {
        return Err(AppError::Conflict(format!(
            "cannot change status from {} to {}",
            current.status.as_str(),
            next_status.as_str()
        )));
    }
    if enforce_transitions && !current.payment_status.can_transition_to(next_payment) {
        return Err(AppError::Conflict(format!(
            "cannot change paymentStatus from {} to {}",
            current.payment_status.as_str(),
            next_payment.as_str()
        )));
    }

    if next_status == current.status && next_payment == current.payment_status {
        return Ok(current);
    }

    let now = Utc::now().trunc_subsecs(3);
    if !queries::update_booking_lifecycle(conn, id, next_status, next_payment, &now)? {
        return Err(AppError::NotFound(format!("booking {id}")));
    }
    tracing::info!(
        booking_id = %id,
        status = next_status.as_str(),
        payment_status = next_payment.as_str(),
        admin = !enforce_transitions,
        "booking updated"
    );

    Ok(Booking {
        status: next_status,
        payment_status: next_payment,
        updated_at: now,
        ..current
    })
}

pub fn delete_booking(conn: &Connection, id: &str) -> Result<(), AppError> {
    if !queries::delete_booking(conn, id)? {
        return Err(AppError::NotFound(format!("booking {id}")));
    }
    tracing::info!(booking_id = %id, "booking deleted");
    Ok(())
}
