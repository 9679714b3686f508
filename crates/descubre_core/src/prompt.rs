//! crates/descubre_core/src/prompt.rs
//!
//! Renders a trip request and its candidate destinations into the single
//! natural-language prompt sent to the text-generation API.

use crate::domain::{Level, LocationInfo, Place};
use crate::lists::PlaceStats;
use crate::trip::ValidTrip;

/// Destinations embedded in a prompt; the rest are left out to stay within the
/// provider's input limits.
pub const MAX_PROMPT_DESTINATIONS: usize = 10;

/// Climate line used until a weather source exists.
pub const UNKNOWN_CLIMATE: &str = "Desconocido";

const NO_DESCRIPTION: &str = "Sin descripción disponible.";

/// Everything the prompt is rendered from.
pub struct PromptInput<'a> {
    pub trip: &'a ValidTrip,
    pub province: &'a LocationInfo,
    pub district: &'a LocationInfo,
    pub stats: &'a PlaceStats,
    pub climate: &'a str,
    pub destinations: &'a [Place],
}

fn or_fallback<'a>(value: Option<&'a str>, fallback: &'a str) -> &'a str {
    match value.map(str::trim) {
        Some(v) if !v.is_empty() => v,
        _ => fallback,
    }
}

fn joined_or(items: &[String], fallback: &str) -> String {
    if items.is_empty() {
        fallback.to_string()
    } else {
        items.join(", ")
    }
}

fn level_text(level: Level) -> String {
    format!("{} ({})", level.label(), level.ordinal())
}

fn destination_block(index: usize, place: &Place) -> String {
    format!(
        "({}) {} - {}\nDescripción: {}\nComida: {}\nNota cultural: {}",
        index + 1,
        place.name,
        or_fallback(place.place_type.as_deref(), "sin tipo"),
        or_fallback(place.description.as_deref(), "Sin descripción."),
        joined_or(&place.local_foods, "N/A"),
        joined_or(&place.cultural_notes, "N/A"),
    )
}

/// Compiles the prompt. Deterministic for a given input; only the first
/// `MAX_PROMPT_DESTINATIONS` destinations are included, in the order given.
pub fn compile_prompt(input: &PromptInput<'_>) -> String {
    let trip = input.trip;
    let destinations = input
        .destinations
        .iter()
        .take(MAX_PROMPT_DESTINATIONS)
        .enumerate()
        .map(|(i, p)| destination_block(i, p))
        .collect::<Vec<_>>()
        .join("\n\n");

    format!(
        "Eres un experto en turismo peruano. Planifica un itinerario turístico personalizado de {days} día(s) basado en:

📍 Provincia: {province}
📝 {province_desc}

📍 Distrito: {district}
📝 {district_desc}

🗓️ Fechas: del {start} al {end}
🎯 Tipo de experiencia: {experience}
💪 Esfuerzo físico: {effort}
💰 Presupuesto: {budget}
⭐ Prioridad personal: {priority}
🌤️ Clima estimado: {climate}

🍽️ Comidas típicas destacadas: {foods}
📜 Notas culturales: {notes}

🏞️ Lugares sugeridos:
{destinations}

📝 Devuelve un itinerario día por día con:
- Nombre del día
- Actividades variadas (1 o 2 por día)
- Horario tentativo (mañana / tarde)
- Almuerzo sugerido
- Nota cultural si aplica
- Presupuesto estimado de gastos en soles por persona
- En español, formato claro tipo guía de viaje.",
        days = trip.days,
        province = input.province.name,
        province_desc = or_fallback(input.province.description.as_deref(), NO_DESCRIPTION),
        district = input.district.name,
        district_desc = or_fallback(input.district.description.as_deref(), NO_DESCRIPTION),
        start = trip.date_start.format("%Y-%m-%d"),
        end = trip.date_end.format("%Y-%m-%d"),
        experience = trip.experience_type,
        effort = level_text(trip.effort_level),
        budget = level_text(trip.budget_level),
        priority = trip.priority,
        climate = input.climate,
        foods = joined_or(&input.stats.foods, "Desconocidas"),
        notes = joined_or(&input.stats.cultural_notes, "No especificadas"),
        destinations = destinations,
    )
}
