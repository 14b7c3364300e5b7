use axum::extract::State;
use axum::Json;
use rand::seq::IndexedRandom;
use tokio::task::spawn_blocking;
use tracing::warn;

use keepsake_types::api::ReasonResponse;

use crate::AppState;

/// Built-in reasons used whenever the table is empty or unreachable.
pub const FALLBACK_REASONS: &[&str] = &[
    "Seu sorriso ilumina qualquer dia nublado",
    "Você me faz rir até quando eu não quero",
    "Seu abraço é o meu lugar favorito no mundo",
    "Você acredita em mim mais do que eu mesmo",
    "Cada dia ao seu lado é uma nova aventura",
    "Você deixa tudo mais bonito só por estar perto",
    "Seu jeito de cuidar de quem você ama",
    "A paciência que você tem comigo",
    "Você é meu porto seguro",
    "Seu cheiro que me acalma",
    "A forma como você canta desafinado sem vergonha",
    "Você me escolhe todos os dias, e eu escolho você",
];

/// Pick a reason at random, avoiding the previous pick whenever any other
/// candidate exists. Duplicate rows can leave no alternative; then the
/// repeat is allowed rather than retried.
pub fn pick_reason(reasons: &[String], last: Option<&str>) -> Option<String> {
    let mut rng = rand::rng();
    let fresh: Vec<&String> = reasons
        .iter()
        .filter(|reason| Some(reason.as_str()) != last)
        .collect();
    if let Some(pick) = fresh.choose(&mut rng) {
        return Some((*pick).clone());
    }
    reasons.choose(&mut rng).cloned()
}

pub async fn random_reason(State(state): State<AppState>) -> Json<ReasonResponse> {
    let db_state = state.clone();
    let mut reasons = match spawn_blocking(move || db_state.db.list_reason_texts()).await {
        Ok(Ok(rows)) => rows,
        Ok(Err(e)) => {
            warn!("Falling back to built-in reasons: {}", e);
            Vec::new()
        }
        Err(e) => {
            warn!("Falling back to built-in reasons: {}", e);
            Vec::new()
        }
    };
    if reasons.is_empty() {
        reasons = FALLBACK_REASONS.iter().map(|s| s.to_string()).collect();
    }

    let mut last = state.last_reason.lock().unwrap_or_else(|e| e.into_inner());
    let texto = match pick_reason(&reasons, last.as_deref()) {
        Some(texto) => texto,
        None => String::new(),
    };
    *last = Some(texto.clone());
    Json(ReasonResponse { texto })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn reasons(n: usize) -> Vec<String> {
        (0..n).map(|i| format!("reason {}", i)).collect()
    }

    #[test]
    fn never_repeats_the_previous_pick() {
        let list = reasons(3);
        let mut last = pick_reason(&list, None).unwrap();
        for _ in 0..200 {
            let next = pick_reason(&list, Some(&last)).unwrap();
            assert_ne!(next, last);
            last = next;
        }
    }

    #[test]
    fn single_reason_is_allowed_to_repeat() {
        let list = reasons(1);
        assert_eq!(
            pick_reason(&list, Some("reason 0")).unwrap(),
            "reason 0"
        );
    }

    #[test]
    fn duplicate_only_list_terminates_with_a_repeat() {
        // Duplicate rows leave no fresh candidate; the picker must still
        // return instead of retrying forever.
        let list = vec!["x".to_string(), "x".to_string()];
        assert_eq!(pick_reason(&list, Some("x")).unwrap(), "x");
    }

    #[test]
    fn duplicates_of_last_are_skipped_when_an_alternative_exists() {
        let list = vec!["x".to_string(), "x".to_string(), "y".to_string()];
        for _ in 0..50 {
            assert_eq!(pick_reason(&list, Some("x")).unwrap(), "y");
        }
    }

    #[test]
    fn empty_list_yields_nothing() {
        assert!(pick_reason(&[], None).is_none());
    }

    #[test]
    fn fallback_list_is_non_empty() {
        assert!(FALLBACK_REASONS.len() >= 2);
    }
}
