use crate::state::{
    ArenaState,
    Phase,
    Player,
    Position,
};
use std::cmp::Ordering;

/// One player's final line in the standings.
#[derive(Clone, Debug, PartialEq)]
pub struct PlayerStanding {
    pub player_id: String,
    pub alive: bool,
    pub blocks_destroyed: u32,
    pub damage_dealt: u32,
    pub distance_from_center: f32,
    pub rank: u32,
}

#[derive(Clone, Debug, PartialEq)]
pub struct MatchOutcome {
    pub winner_id: String,
    pub standings: Vec<PlayerStanding>,
}

impl ArenaState {
    /// Final result of an ended match. `None` while the match is still in
    /// flight or when it never had players.
    pub fn outcome(&self) -> Option<MatchOutcome> {
        if self.phase() != Phase::Ended || self.players().is_empty() {
            return None;
        }
        let center = self.center();
        let winner = select_winner(self.players(), center);
        let standings = rank_players(self.players(), center);
        Some(MatchOutcome {
            winner_id: winner.id.clone(),
            standings,
        })
    }
}

/// Winner precedence: a single survivor wins outright; with none left the
/// most destructive player wins (damage breaks ties); with several left
/// the most destructive survivor wins (proximity to the centre breaks
/// ties). Strict comparisons throughout, so the earlier player keeps an
/// exact tie.
fn select_winner(players: &[Player], center: Position) -> &Player {
    let alive: Vec<&Player> = players.iter().filter(|player| player.alive).collect();
    match alive.len() {
        1 => alive[0],
        0 => players
            .iter()
            .reduce(|best, candidate| {
                if candidate.blocks_destroyed != best.blocks_destroyed {
                    if candidate.blocks_destroyed > best.blocks_destroyed {
                        candidate
                    } else {
                        best
                    }
                } else if candidate.damage_dealt > best.damage_dealt {
                    candidate
                } else {
                    best
                }
            })
            .expect("players checked non-empty"),
        _ => alive
            .into_iter()
            .reduce(|best, candidate| {
                if candidate.blocks_destroyed != best.blocks_destroyed {
                    if candidate.blocks_destroyed > best.blocks_destroyed {
                        candidate
                    } else {
                        best
                    }
                } else if candidate.position.distance_to(center)
                    < best.position.distance_to(center)
                {
                    candidate
                } else {
                    best
                }
            })
            .expect("alive players checked non-empty"),
    }
}

/// Standings order: survivors first, then blocks destroyed descending,
/// then distance from the centre ascending. Ranks are 1-based.
fn rank_players(players: &[Player], center: Position) -> Vec<PlayerStanding> {
    let mut ordered: Vec<&Player> = players.iter().collect();
    ordered.sort_by(|a, b| {
        b.alive
            .cmp(&a.alive)
            .then(b.blocks_destroyed.cmp(&a.blocks_destroyed))
            .then(
                a.position
                    .distance_to(center)
                    .partial_cmp(&b.position.distance_to(center))
                    .unwrap_or(Ordering::Equal),
            )
    });
    ordered
        .into_iter()
        .enumerate()
        .map(|(index, player)| PlayerStanding {
            player_id: player.id.clone(),
            alive: player.alive,
            blocks_destroyed: player.blocks_destroyed,
            damage_dealt: player.damage_dealt,
            distance_from_center: player.position.distance_to(center),
            rank: index as u32 + 1,
        })
        .collect()
}

#[cfg(test)]
mod tests {
    #![allow(non_snake_case)]
    use super::*;
    use crate::state::{
        ArenaConfig,
        ArenaState,
    };
    use rand::{
        SeedableRng,
        rngs::StdRng,
    };

    fn ended_state(players: Vec<Player>) -> ArenaState {
        let mut state = ArenaState::new(ArenaConfig::default());
        let roster: Vec<String> = players.iter().map(|p| p.id.clone()).collect();
        let mut rng = StdRng::seed_from_u64(3);
        state.start(&roster, &mut rng);
        state.players = players;
        state.time_left = 1;
        state.blocks.clear();
        state.step();
        state
    }

    fn player(id: &str, x: f32, y: f32, blocks: u32, damage: u32, alive: bool) -> Player {
        Player {
            id: id.to_string(),
            position: Position::new(x, y),
            blocks_destroyed: blocks,
            damage_dealt: damage,
            color: "#FF6B6B".to_string(),
            alive,
        }
    }

    #[test]
    fn outcome__is_none_while_running() {
        let mut state = ArenaState::new(ArenaConfig::default());
        let roster = vec!["alice".to_string(), "bob".to_string()];
        let mut rng = StdRng::seed_from_u64(3);
        state.start(&roster, &mut rng);
        assert_eq!(state.outcome(), None);
    }

    #[test]
    fn winner__single_survivor_wins_outright() {
        // given
        let state = ended_state(vec![
            player("alice", 100.0, 100.0, 0, 0, true),
            player("bob", 120.0, 100.0, 9, 90, false),
        ]);

        // when
        let outcome = state.outcome().unwrap();

        // then
        assert_eq!(outcome.winner_id, "alice");
    }

    #[test]
    fn winner__blocks_tie_among_survivors_breaks_on_proximity() {
        // given: both alive with 3 blocks, bob nearer the centre (210, 210)
        let state = ended_state(vec![
            player("alice", 50.0, 50.0, 3, 30, true),
            player("bob", 200.0, 200.0, 3, 30, true),
        ]);

        // when
        let outcome = state.outcome().unwrap();

        // then
        assert_eq!(outcome.winner_id, "bob");
    }

    #[test]
    fn winner__survivor_with_more_blocks_beats_proximity() {
        let state = ended_state(vec![
            player("alice", 50.0, 50.0, 4, 40, true),
            player("bob", 200.0, 200.0, 3, 30, true),
        ]);
        assert_eq!(state.outcome().unwrap().winner_id, "alice");
    }

    #[test]
    fn winner__nobody_alive_breaks_block_tie_on_damage() {
        // given
        let state = ended_state(vec![
            player("alice", 100.0, 100.0, 5, 20, false),
            player("bob", 300.0, 300.0, 5, 30, false),
        ]);

        // when
        let outcome = state.outcome().unwrap();

        // then
        assert_eq!(outcome.winner_id, "bob");
    }

    #[test]
    fn winner__exact_tie_keeps_the_earlier_player() {
        let state = ended_state(vec![
            player("alice", 100.0, 100.0, 5, 30, false),
            player("bob", 300.0, 300.0, 5, 30, false),
        ]);
        assert_eq!(state.outcome().unwrap().winner_id, "alice");
    }

    #[test]
    fn standings__order_survivors_then_blocks_then_proximity() {
        // given
        let state = ended_state(vec![
            player("dead_ace", 210.0, 210.0, 9, 90, false),
            player("far", 10.0, 10.0, 2, 20, true),
            player("near", 205.0, 210.0, 2, 20, true),
            player("top", 400.0, 400.0, 6, 60, true),
        ]);

        // when
        let outcome = state.outcome().unwrap();

        // then
        let order: Vec<&str> = outcome
            .standings
            .iter()
            .map(|standing| standing.player_id.as_str())
            .collect();
        assert_eq!(order, vec!["top", "near", "far", "dead_ace"]);
        let ranks: Vec<u32> =
            outcome.standings.iter().map(|standing| standing.rank).collect();
        assert_eq!(ranks, vec![1, 2, 3, 4]);
    }
}
