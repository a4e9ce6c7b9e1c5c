use chrono::{SubsecRound, Utc};
use rusqlite::Connection;

use crate::db::queries;
use crate::errors::AppError;
use crate::models::booking::non_blank;
use crate::models::event::slugify;
use crate::models::{CreateEventTypeRequest, EventKind, EventType, NewEventType, Pricing};

pub fn list_event_types(conn: &Connection) -> Result<Vec<EventType>, AppError> {
    Ok(queries::list_event_types(conn)?)
}

/// Looks up a catalog entry by its path id. Ids that are not integers can
/// never exist, so they are reported as not found too.
pub fn get_event_type(conn: &Connection, raw_id: &str) -> Result<EventType, AppError> {
    let not_found = || AppError::NotFound(format!("event type {raw_id}"));
    let id: i64 = raw_id.trim().parse().map_err(|_| not_found())?;
    queries::get_event_type_by_id(conn, id)?.ok_or_else(not_found)
}

pub fn create_event_type(
    conn: &Connection,
    request: CreateEventTypeRequest,
) -> Result<EventType, AppError> {
    let mut errors = vec![];

    let name = non_blank(request.name);
    if name.is_none() {
        errors.push("name is required".to_string());
    }
    let description = non_blank(request.description);
    if description.is_none() {
        errors.push("description is required".to_string());
    }

    let pricing = request.pricing.unwrap_or_default();
    match pricing.base {
        None => errors.push("pricing.base is required".to_string()),
        Some(base) if !base.is_finite() || base < 0.0 => {
            errors.push("pricing.base must be a non-negative number".to_string())
        }
        Some(_) => {}
    }
    if let Some(premium) = pricing.premium {
        if !premium.is_finite() || premium < 0.0 {
            errors.push("pricing.premium must be a non-negative number".to_string());
        }
    }

    let (Some(name), Some(description), Some(base), true) =
        (name, description, pricing.base, errors.is_empty())
    else {
        return Err(AppError::Validation(errors));
    };

    if queries::get_event_type_by_name(conn, &name)?.is_some() {
        return Err(AppError::Conflict(format!("event type '{name}' already exists")));
    }

    let new_event = NewEventType {
        name,
        description,
        sub_types: clean_list(request.sub_types.unwrap_or_default()),
        pricing: Pricing {
            base,
            premium: pricing.premium,
        },
        features: clean_list(request.features.unwrap_or_default()),
        image_url: non_blank(request.image_url),
    };

    let id = queries::insert_event_type(conn, &new_event, &Utc::now().trunc_subsecs(3))?;
    tracing::info!(event_id = id, name = %new_event.name, "event type created");

    queries::get_event_type_by_id(conn, id)?
        .ok_or_else(|| AppError::Internal(anyhow::anyhow!("event type {id} vanished after insert")))
}

/// Trims entries, drops blanks and repeated entries, keeps first-seen order.
fn clean_list(items: Vec<String>) -> Vec<String> {
    let mut out: Vec<String> = Vec::with_capacity(items.len());
    for item in items {
        let item = item.trim();
        if !item.is_empty() && !out.iter().any(|seen| seen.eq_ignore_ascii_case(item)) {
            out.push(item.to_string());
        }
    }
    out
}

/// Resolves the sub-type of a booking against the catalog entry for `kind`.
///
/// `explicit` is the `subType` field of the request, `implied` the text taken
/// from a combined form value like `wedding-mehndi`. Returns the catalog's
/// spelling of the sub-type. Kinds without a catalog entry accept any
/// sub-type as written.
pub fn resolve_sub_type(
    conn: &Connection,
    kind: EventKind,
    explicit: Option<&str>,
    implied: Option<&str>,
) -> Result<Option<String>, AppError> {
    let explicit = explicit.map(str::trim).filter(|s| !s.is_empty());

    let candidate = match (explicit, implied) {
        (Some(e), Some(i)) if slugify(e) != slugify(i) => {
            return Err(AppError::validation(format!(
                "subType '{e}' does not match the sub-type implied by eventType ('{i}')"
            )));
        }
        (Some(e), _) => e.to_string(),
        (None, Some(i)) => i.to_string(),
        (None, None) => return Ok(None),
    };

    let entry = match kind.catalog_name() {
        Some(name) => queries::get_event_type_by_name(conn, name)?,
        None => None,
    };
    let Some(entry) = entry else {
        return Ok(Some(candidate));
    };

    let wanted = slugify(&candidate);
    entry
        .sub_types
        .iter()
        .find(|known| slugify(known) == wanted)
        .cloned()
        .map(Some)
        .ok_or_else(|| {
            AppError::validation(format!(
                "subType '{candidate}' is not offered for {}; expected one of: {}",
                entry.name,
                entry.sub_types.join(", ")
            ))
        })
}

/// Finds the event kind whose catalog entry lists `sub_type`, returning the
/// kind and the catalog spelling.
pub fn kind_offering(
    conn: &Connection,
    sub_type: &str,
) -> Result<Option<(EventKind, String)>, AppError> {
    let wanted = slugify(sub_type);
    for kind in EventKind::ALL {
        let Some(name) = kind.catalog_name() else {
            continue;
        };
        let Some(entry) = queries::get_event_type_by_name(conn, name)? else {
            continue;
        };
        if let Some(known) = entry.sub_types.into_iter().find(|known| slugify(known) == wanted) {
            return Ok(Some((kind, known)));
        }
    }
    Ok(None)
}
