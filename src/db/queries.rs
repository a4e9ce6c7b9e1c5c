use anyhow::Context;
use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use rusqlite::types::ToSql;
use rusqlite::{params, Connection};

use crate::models::{
    Booking, BookingFilter, BookingStatus, EventKind, EventType, NewEventType, PaymentStatus,
    Pricing, Venue,
};

const TIMESTAMP_WRITE_FORMAT: &str = "%Y-%m-%d %H:%M:%S%.3f";
const TIMESTAMP_READ_FORMAT: &str = "%Y-%m-%d %H:%M:%S%.f";
const DATE_FORMAT: &str = "%Y-%m-%d";

const BOOKING_COLUMNS: &str = "id, user_id, event_type, sub_type, event_date, time_slot, \
     venue_name, venue_address, venue_city, guest_count, requirements, budget, status, \
     payment_status, client_name, contact_number, email, created_at, updated_at";

const EVENT_COLUMNS: &str =
    "id, name, description, sub_types, base_price, premium_price, features, image_url, created_at";

pub fn format_timestamp(ts: &DateTime<Utc>) -> String {
    ts.naive_utc().format(TIMESTAMP_WRITE_FORMAT).to_string()
}

fn parse_timestamp(s: &str) -> anyhow::Result<DateTime<Utc>> {
    let naive = NaiveDateTime::parse_from_str(s, TIMESTAMP_READ_FORMAT)
        .with_context(|| format!("invalid stored timestamp: {s}"))?;
    Ok(naive.and_utc())
}

// ── Bookings ──

pub fn insert_booking(conn: &Connection, booking: &Booking) -> anyhow::Result<()> {
    let venue = booking.venue.clone().unwrap_or_default();

    conn.execute(
        &format!(
            "INSERT INTO bookings ({BOOKING_COLUMNS})
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14, ?15, ?16, ?17, ?18, ?19)"
        ),
        params![
            booking.id,
            booking.user,
            booking.event_type.as_str(),
            booking.sub_type,
            booking.date.format(DATE_FORMAT).to_string(),
            booking.time,
            venue.name,
            venue.address,
            venue.city,
            booking.guest_count,
            booking.requirements,
            booking.budget,
            booking.status.as_str(),
            booking.payment_status.as_str(),
            booking.client_name,
            booking.contact_number,
            booking.email,
            format_timestamp(&booking.created_at),
            format_timestamp(&booking.updated_at),
        ],
    )
    .context("failed to insert booking")?;
    Ok(())
}

pub fn get_booking_by_id(conn: &Connection, id: &str) -> anyhow::Result<Option<Booking>> {
    let result = conn.query_row(
        &format!("SELECT {BOOKING_COLUMNS} FROM bookings WHERE id = ?1"),
        params![id],
        |row| Ok(parse_booking_row(row)),
    );

    match result {
        Ok(booking) => Ok(Some(booking?)),
        Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
        Err(e) => Err(e.into()),
    }
}

pub fn list_bookings(conn: &Connection, filter: &BookingFilter) -> anyhow::Result<Vec<Booking>> {
    let mut clauses: Vec<&str> = vec![];
    let mut params_vec: Vec<Box<dyn ToSql>> = vec![];

    if let Some(status) = filter.status {
        clauses.push("status = ?");
        params_vec.push(Box::new(status.as_str()));
    }
    if let Some(payment_status) = filter.payment_status {
        clauses.push("payment_status = ?");
        params_vec.push(Box::new(payment_status.as_str()));
    }
    if let Some(from) = filter.from {
        clauses.push("event_date >= ?");
        params_vec.push(Box::new(from.format(DATE_FORMAT).to_string()));
    }
    if let Some(to) = filter.to {
        clauses.push("event_date <= ?");
        params_vec.push(Box::new(to.format(DATE_FORMAT).to_string()));
    }

    let where_clause = if clauses.is_empty() {
        String::new()
    } else {
        format!("WHERE {}", clauses.join(" AND "))
    };

    let sql = format!(
        "SELECT {BOOKING_COLUMNS} FROM bookings {where_clause}
         ORDER BY event_date ASC, created_at ASC LIMIT ? OFFSET ?"
    );
    params_vec.push(Box::new(filter.limit));
    params_vec.push(Box::new(filter.offset));

    let mut stmt = conn.prepare(&sql)?;
    let params_refs: Vec<&dyn ToSql> = params_vec.iter().map(|p| p.as_ref()).collect();
    let rows = stmt.query_map(params_refs.as_slice(), |row| Ok(parse_booking_row(row)))?;

    let mut bookings = vec![];
    for row in rows {
        bookings.push(row??);
    }
    Ok(bookings)
}

pub fn update_booking_lifecycle(
    conn: &Connection,
    id: &str,
    status: BookingStatus,
    payment_status: PaymentStatus,
    updated_at: &DateTime<Utc>,
) -> anyhow::Result<bool> {
    let count = conn.execute(
        "UPDATE bookings SET status = ?1, payment_status = ?2, updated_at = ?3 WHERE id = ?4",
        params![
            status.as_str(),
            payment_status.as_str(),
            format_timestamp(updated_at),
            id
        ],
    )?;
    Ok(count > 0)
}

pub fn delete_booking(conn: &Connection, id: &str) -> anyhow::Result<bool> {
    let count = conn.execute("DELETE FROM bookings WHERE id = ?1", params![id])?;
    Ok(count > 0)
}

fn parse_booking_row(row: &rusqlite::Row) -> anyhow::Result<Booking> {
    let id: String = row.get(0)?;
    let event_type_str: String = row.get(2)?;
    let date_str: String = row.get(4)?;
    let status_str: String = row.get(12)?;
    let payment_status_str: String = row.get(13)?;
    let created_at_str: String = row.get(17)?;
    let updated_at_str: String = row.get(18)?;

    let event_type = EventKind::parse(&event_type_str)
        .map(|(kind, _)| kind)
        .with_context(|| format!("booking {id} has unknown event type: {event_type_str}"))?;
    let date = NaiveDate::parse_from_str(&date_str, DATE_FORMAT)
        .with_context(|| format!("booking {id} has invalid date: {date_str}"))?;
    let status = BookingStatus::parse(&status_str)
        .with_context(|| format!("booking {id} has unknown status: {status_str}"))?;
    let payment_status = PaymentStatus::parse(&payment_status_str).with_context(|| {
        format!("booking {id} has unknown payment status: {payment_status_str}")
    })?;

    let venue = Venue {
        name: row.get(6)?,
        address: row.get(7)?,
        city: row.get(8)?,
    };

    Ok(Booking {
        user: row.get(1)?,
        event_type,
        sub_type: row.get(3)?,
        date,
        time: row.get(5)?,
        venue: venue.normalized(),
        guest_count: row.get(9)?,
        requirements: row.get(10)?,
        budget: row.get(11)?,
        status,
        payment_status,
        client_name: row.get(14)?,
        contact_number: row.get(15)?,
        email: row.get(16)?,
        created_at: parse_timestamp(&created_at_str)?,
        updated_at: parse_timestamp(&updated_at_str)?,
        id,
    })
}

// ── Event Catalog ──

pub fn list_event_types(conn: &Connection) -> anyhow::Result<Vec<EventType>> {
    let mut stmt = conn.prepare(&format!("SELECT {EVENT_COLUMNS} FROM events ORDER BY id ASC"))?;
    let rows = stmt.query_map([], |row| Ok(parse_event_row(row)))?;

    let mut events = vec![];
    for row in rows {
        events.push(row??);
    }
    Ok(events)
}

pub fn get_event_type_by_id(conn: &Connection, id: i64) -> anyhow::Result<Option<EventType>> {
    let result = conn.query_row(
        &format!("SELECT {EVENT_COLUMNS} FROM events WHERE id = ?1"),
        params![id],
        |row| Ok(parse_event_row(row)),
    );

    match result {
        Ok(event) => Ok(Some(event?)),
        Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
        Err(e) => Err(e.into()),
    }
}

/// Case-insensitive lookup; the `name` column is declared `COLLATE NOCASE`.
pub fn get_event_type_by_name(conn: &Connection, name: &str) -> anyhow::Result<Option<EventType>> {
    let result = conn.query_row(
        &format!("SELECT {EVENT_COLUMNS} FROM events WHERE name = ?1"),
        params![name],
        |row| Ok(parse_event_row(row)),
    );

    match result {
        Ok(event) => Ok(Some(event?)),
        Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
        Err(e) => Err(e.into()),
    }
}

pub fn insert_event_type(
    conn: &Connection,
    event: &NewEventType,
    created_at: &DateTime<Utc>,
) -> anyhow::Result<i64> {
    let sub_types = serde_json::to_string(&event.sub_types)?;
    let features = serde_json::to_string(&event.features)?;

    conn.execute(
        "INSERT INTO events (name, description, sub_types, base_price, premium_price, features, image_url, created_at)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
        params![
            event.name,
            event.description,
            sub_types,
            event.pricing.base,
            event.pricing.premium,
            features,
            event.image_url,
            format_timestamp(created_at),
        ],
    )
    .context("failed to insert event type")?;
    Ok(conn.last_insert_rowid())
}

fn parse_event_row(row: &rusqlite::Row) -> anyhow::Result<EventType> {
    let id: i64 = row.get(0)?;
    let sub_types_json: String = row.get(3)?;
    let features_json: String = row.get(6)?;
    let created_at_str: String = row.get(8)?;

    let sub_types: Vec<String> = serde_json::from_str(&sub_types_json)
        .with_context(|| format!("event {id} has malformed sub_types"))?;
    let features: Vec<String> = serde_json::from_str(&features_json)
        .with_context(|| format!("event {id} has malformed features"))?;

    Ok(EventType {
        id,
        name: row.get(1)?,
        description: row.get(2)?,
        sub_types,
        pricing: Pricing {
            base: row.get(4)?,
            premium: row.get(5)?,
        },
        features,
        image_url: row.get(7)?,
        created_at: parse_timestamp(&created_at_str)?,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db;

    fn booking(id: &str, date: &str, status: BookingStatus) -> Booking {
        let now = Utc::now();
        Booking {
            id: id.to_string(),
            user: None,
            event_type: EventKind::Wedding,
            sub_type: Some("Mehndi".to_string()),
            date: NaiveDate::parse_from_str(date, DATE_FORMAT).unwrap(),
            time: Some("18:00".to_string()),
            venue: Some(Venue {
                name: Some("Lotus Banquet".to_string()),
                address: None,
                city: Some("Pune".to_string()),
            }),
            guest_count: Some(150),
            requirements: None,
            budget: Some(40000.0),
            status,
            payment_status: PaymentStatus::Unpaid,
            client_name: "Asha Rao".to_string(),
            contact_number: "9999999999".to_string(),
            email: None,
            created_at: now,
            updated_at: now,
        }
    }

    #[test]
    fn test_booking_insert_and_fetch() {
        let conn = db::init_db(":memory:").unwrap();
        let original = booking("b-1", "2025-03-01", BookingStatus::Pending);
        insert_booking(&conn, &original).unwrap();

        let fetched = get_booking_by_id(&conn, "b-1").unwrap().unwrap();
        assert_eq!(fetched.event_type, EventKind::Wedding);
        assert_eq!(fetched.sub_type.as_deref(), Some("Mehndi"));
        assert_eq!(fetched.venue, original.venue);
        assert_eq!(fetched.guest_count, Some(150));
        assert_eq!(fetched.created_at.timestamp_millis(), original.created_at.timestamp_millis());

        assert!(get_booking_by_id(&conn, "missing").unwrap().is_none());
    }

    #[test]
    fn test_list_bookings_filters_and_paginates() {
        let conn = db::init_db(":memory:").unwrap();
        insert_booking(&conn, &booking("b-1", "2025-03-01", BookingStatus::Pending)).unwrap();
        insert_booking(&conn, &booking("b-2", "2025-04-10", BookingStatus::Confirmed)).unwrap();
        insert_booking(&conn, &booking("b-3", "2025-05-20", BookingStatus::Pending)).unwrap();

        let all = list_bookings(&conn, &BookingFilter::default()).unwrap();
        let ids: Vec<_> = all.iter().map(|b| b.id.as_str()).collect();
        assert_eq!(ids, vec!["b-1", "b-2", "b-3"]);

        let pending = list_bookings(
            &conn,
            &BookingFilter {
                status: Some(BookingStatus::Pending),
                ..BookingFilter::default()
            },
        )
        .unwrap();
        assert_eq!(pending.len(), 2);

        let ranged = list_bookings(
            &conn,
            &BookingFilter {
                from: NaiveDate::from_ymd_opt(2025, 4, 1),
                to: NaiveDate::from_ymd_opt(2025, 5, 20),
                ..BookingFilter::default()
            },
        )
        .unwrap();
        let ids: Vec<_> = ranged.iter().map(|b| b.id.as_str()).collect();
        assert_eq!(ids, vec!["b-2", "b-3"]);

        let page = list_bookings(
            &conn,
            &BookingFilter {
                limit: 1,
                offset: 1,
                ..BookingFilter::default()
            },
        )
        .unwrap();
        assert_eq!(page.len(), 1);
        assert_eq!(page[0].id, "b-2");
    }

    #[test]
    fn test_update_and_delete_booking() {
        let conn = db::init_db(":memory:").unwrap();
        insert_booking(&conn, &booking("b-1", "2025-03-01", BookingStatus::Pending)).unwrap();

        let updated = update_booking_lifecycle(
            &conn,
            "b-1",
            BookingStatus::Confirmed,
            PaymentStatus::Partial,
            &Utc::now(),
        )
        .unwrap();
        assert!(updated);
        let fetched = get_booking_by_id(&conn, "b-1").unwrap().unwrap();
        assert_eq!(fetched.status, BookingStatus::Confirmed);
        assert_eq!(fetched.payment_status, PaymentStatus::Partial);

        assert!(delete_booking(&conn, "b-1").unwrap());
        assert!(!delete_booking(&conn, "b-1").unwrap());
        assert!(!update_booking_lifecycle(
            &conn,
            "b-1",
            BookingStatus::Cancelled,
            PaymentStatus::Unpaid,
            &Utc::now()
        )
        .unwrap());
    }

    #[test]
    fn test_seeded_catalog() {
        let conn = db::init_db(":memory:").unwrap();
        let events = list_event_types(&conn).unwrap();
        assert_eq!(events.len(), 6);
        assert_eq!(events[0].name, "Wedding");
        assert_eq!(events[0].sub_types, vec!["Haldi", "Mehndi", "Sangeet", "Reception"]);
        assert_eq!(events[0].pricing.base, 25000.0);

        let by_name = get_event_type_by_name(&conn, "birthday party").unwrap().unwrap();
        assert_eq!(by_name.name, "Birthday Party");
        assert_eq!(get_event_type_by_id(&conn, by_name.id).unwrap(), Some(by_name));
        assert!(get_event_type_by_id(&conn, 999).unwrap().is_none());
    }

    #[test]
    fn test_insert_event_type() {
        let conn = db::init_db(":memory:").unwrap();
        let new_event = NewEventType {
            name: "Corporate Gala".to_string(),
            description: "Stage and lighting for company events.".to_string(),
            sub_types: vec!["Award Night".to_string()],
            pricing: Pricing {
                base: 50000.0,
                premium: None,
            },
            features: vec![],
            image_url: None,
        };
        let id = insert_event_type(&conn, &new_event, &Utc::now()).unwrap();
        let stored = get_event_type_by_id(&conn, id).unwrap().unwrap();
        assert_eq!(stored.name, "Corporate Gala");
        assert_eq!(stored.sub_types, vec!["Award Night"]);
        assert_eq!(stored.pricing.premium, None);

        // Names are unique regardless of case.
        let duplicate = NewEventType {
            name: "corporate gala".to_string(),
            ..new_event
        };
        assert!(insert_event_type(&conn, &duplicate, &Utc::now()).is_err());
    }
}
