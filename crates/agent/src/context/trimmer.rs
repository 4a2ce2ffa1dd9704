//! History trimming under a token budget.

use lumen_core::message::Message;

use crate::context::token::estimate_message_tokens;

/// The longest suffix of `history` that fits in `budget` after `reserved`.
///
/// Scans newest to oldest. A message is kept while
/// `reserved + kept + cost(message) <= budget`; the first message that does
/// not fit ends the scan, even if older, smaller messages would fit. The
/// result is a contiguous, chronological suffix of `history`.
pub fn trim(history: &[Message], reserved: usize, budget: usize) -> &[Message] {
    if reserved > budget {
        return &[];
    }

    let mut running = reserved;
    let mut start = history.len();

    for (index, message) in history.iter().enumerate().rev() {
        let cost = estimate_message_tokens(message);
        match running.checked_add(cost) {
            Some(total) if total <= budget => {
                running = total;
                start = index;
            }
            _ => break,
        }
    }

    &history[start..]
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::token::estimate_messages_tokens;

    fn msg_of_cost(cost: usize, n: usize) -> Message {
        let text = format!("{n:0>width$}", width = cost * 4);
        if n % 2 == 0 {
            Message::user(text)
        } else {
            Message::assistant(text)
        }
    }

    /// Deterministic history with uneven message sizes.
    fn varied_history(len: usize, seed: u64) -> Vec<Message> {
        let mut state = seed;
        (0..len)
            .map(|n| {
                state = state.wrapping_mul(6364136223846793005).wrapping_add(1442695040888963407);
                let cost = 1 + (state >> 33) as usize % 40;
                msg_of_cost(cost, n)
            })
            .collect()
    }

    fn is_suffix(short: &[Message], long: &[Message]) -> bool {
        short.len() <= long.len() && long[long.len() - short.len()..] == *short
    }

    #[test]
    fn keeps_three_most_recent_of_fifty() {
        let history: Vec<Message> = (0..50).map(|n| msg_of_cost(1000, n)).collect();
        let kept = trim(&history, 0, 3000);
        assert_eq!(kept.len(), 3);
        assert_eq!(kept, &history[47..]);
    }

    #[test]
    fn empty_history() {
        assert!(trim(&[], 0, 100).is_empty());
    }

    #[test]
    fn reserved_above_budget_is_empty() {
        let history = vec![Message::user("hi")];
        assert!(trim(&history, 101, 100).is_empty());
    }

    #[test]
    fn reserved_cost_counts_against_budget() {
        let history: Vec<Message> = (0..5).map(|n| msg_of_cost(10, n)).collect();
        assert_eq!(trim(&history, 0, 50).len(), 5);
        assert_eq!(trim(&history, 25, 50).len(), 2);
    }

    #[test]
    fn oversized_message_is_a_hard_stop() {
        let history = vec![
            msg_of_cost(1, 0),
            msg_of_cost(1, 1),
            msg_of_cost(500, 2),
            msg_of_cost(1, 3),
        ];
        let kept = trim(&history, 0, 100);
        assert_eq!(kept, &history[3..]);
    }

    #[test]
    fn exact_fit_is_included() {
        let history = vec![msg_of_cost(10, 0), msg_of_cost(10, 1)];
        assert_eq!(trim(&history, 0, 20).len(), 2);
        assert_eq!(trim(&history, 0, 19).len(), 1);
    }

    #[test]
    fn result_is_suffix_within_budget() {
        for seed in 0..20 {
            let history = varied_history(60, seed);
            for budget in [0, 1, 15, 100, 333, 1000, 5000] {
                let kept = trim(&history, 0, budget);
                assert!(is_suffix(kept, &history));
                assert!(estimate_messages_tokens(kept) <= budget);
            }
        }
    }

    #[test]
    fn trimming_is_idempotent() {
        for seed in 0..20 {
            let history = varied_history(60, seed);
            for budget in [7, 120, 480, 2000] {
                let once = trim(&history, 0, budget);
                let twice = trim(once, 0, budget);
                assert_eq!(once, twice);
            }
        }
    }

    #[test]
    fn smaller_budget_gives_suffix_of_larger() {
        for seed in 0..20 {
            let history = varied_history(60, seed);
            let budgets = [0, 10, 50, 200, 800, 3000];
            for pair in budgets.windows(2) {
                let small = trim(&history, 0, pair[0]);
                let large = trim(&history, 0, pair[1]);
                assert!(is_suffix(small, large));
            }
        }
    }
}
