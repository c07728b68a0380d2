//! Events emitted to the front end and result descriptors
//!
//! The engine never renders; it hands the boundary a `RenderState` view of
//! the live payload (secrets held back until resolution) or a
//! `ResolutionResult` descriptor with the narrative fields.

use crate::games::{GamePayload, ResultDetail, ResultTag};
use crate::session::{ResolveTrigger, SessionKind};
use serde::Serialize;
use serde_json::json;

/// Renderable snapshot of a session for the front end
#[derive(Debug, Clone, Serialize)]
pub struct RenderState {
    pub kind: SessionKind,
    pub wager: u64,
    pub view: serde_json::Value,
}

/// Result descriptor returned from every resolution
#[derive(Debug, Clone, Serialize)]
pub struct ResolutionResult {
    pub session_id: String,
    pub scope: String,
    pub kind: SessionKind,
    pub trigger: ResolveTrigger,
    pub wager: u64,
    /// Total credited back, stake included where the rule returns it
    pub payout: u64,
    pub tag: ResultTag,
    pub detail: ResultDetail,
}

/// Stream of session happenings for the front end to subscribe to
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum EngineEvent {
    SessionStarted { scope: String, render: RenderState },
    SessionUpdated { scope: String, render: RenderState },
    SessionResolved { scope: String, result: ResolutionResult },
}

/// Build the front-end view of a payload. `reveal` exposes fields that stay
/// hidden while the session is live (dealer hole card, crash point).
pub fn render_view(payload: &GamePayload, reveal: bool) -> serde_json::Value {
    match payload {
        GamePayload::Blackjack(table) => {
            let dealer: Vec<String> = if reveal {
                table.dealer.iter().map(|c| c.to_string()).collect()
            } else {
                table
                    .dealer
                    .iter()
                    .enumerate()
                    .map(|(i, c)| {
                        if i == 0 {
                            "🂠".to_string()
                        } else {
                            c.to_string()
                        }
                    })
                    .collect()
            };
            json!({
                "player": table.player.iter().map(|c| c.to_string()).collect::<Vec<_>>(),
                "player_value": table.player_value(),
                "dealer": dealer,
                "dealer_value": if reveal { Some(table.dealer_value()) } else { None },
            })
        }
        GamePayload::Crash(round) => json!({
            "multiplier": (round.multiplier * 100.0).round() / 100.0,
            "crash_point": if reveal { Some(round.crash_point) } else { None },
        }),
        GamePayload::Roulette { bet, spun } => json!({
            "bet": bet.to_string(),
            "spun": spun,
        }),
        GamePayload::Dice { called, rolled } => json!({
            "called": called,
            "rolled": rolled,
        }),
        GamePayload::Slots { reels } => json!({
            "reels": reels.iter().map(|r| r.to_string()).collect::<Vec<_>>(),
        }),
        GamePayload::Coinflip { call, landed } => json!({
            "call": call.to_string(),
            "landed": landed.to_string(),
        }),
        GamePayload::Trivia(round) => json!({
            "question": round.question,
            "xp": round.xp,
            "credits": round.credits,
            "correct_count": round.correct.len(),
            "answer": if reveal { Some(round.answer_display.clone()) } else { None },
        }),
        GamePayload::Life(grid) => {
            let rows: Vec<String> = (0..grid.height)
                .map(|y| {
                    (0..grid.width)
                        .map(|x| if grid.is_alive(x, y) { '⬜' } else { '⬛' })
                        .collect()
                })
                .collect();
            json!({
                "generation": grid.generation,
                "population": grid.population(),
                "rows": rows,
            })
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::games::blackjack::{BlackjackTable, Card};
    use crate::games::{CrashRound, TriviaRound};

    #[test]
    fn test_blackjack_view_hides_hole_card() {
        let table = BlackjackTable {
            deck: vec![],
            player: vec![Card(8), Card(3)],
            dealer: vec![Card(8), Card(4)],
        };
        let payload = GamePayload::Blackjack(table);

        let hidden = render_view(&payload, false);
        assert_eq!(hidden["dealer"][0], "🂠");
        assert!(hidden["dealer_value"].is_null());

        let revealed = render_view(&payload, true);
        assert_ne!(revealed["dealer"][0], "🂠");
        assert_eq!(revealed["dealer_value"], 16);
    }

    #[test]
    fn test_crash_view_hides_crash_point() {
        let payload = GamePayload::Crash(CrashRound {
            crash_point: 3.5,
            multiplier: 1.25,
        });
        let hidden = render_view(&payload, false);
        assert!(hidden["crash_point"].is_null());
        assert_eq!(hidden["multiplier"], 1.25);

        let revealed = render_view(&payload, true);
        assert_eq!(revealed["crash_point"], 3.5);
    }

    #[test]
    fn test_trivia_view_hides_answer() {
        let round = TriviaRound::new("asker", "q?", "secret", 10, 10).unwrap();
        let payload = GamePayload::Trivia(round);
        let hidden = render_view(&payload, false);
        assert!(hidden["answer"].is_null());
        assert_eq!(hidden["correct_count"], 0);
    }
}
