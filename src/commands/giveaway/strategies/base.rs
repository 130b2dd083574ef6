use std::collections::BTreeSet;

pub struct DrawOptions<'a> {
    participants: &'a BTreeSet<String>,
    winner_count: usize,
}

impl<'a> DrawOptions<'a> {
    pub fn new(participants: &'a BTreeSet<String>, winner_count: usize) -> Self {
        DrawOptions {
            participants,
            winner_count,
        }
    }

    // Returns user identifiers registered in the giveaway.
    pub fn participants(&self) -> &'a BTreeSet<String> {
        self.participants
    }

    // Returns how many winners were requested by the giveaway owner.
    pub fn winner_count(&self) -> usize {
        self.winner_count
    }

    // Returns how many winners can actually be drawn.
    pub fn effective_winner_count(&self) -> usize {
        self.winner_count.min(self.participants.len())
    }
}

pub trait GiveawayStrategy: Send + Sync {
    // Returns distinct winners picked from the participants. An empty
    // participant set gives an empty result.
    fn draw(&self, options: &DrawOptions) -> Vec<String>;
}
