use std::time::Duration;

use rand::seq::SliceRandom;

use keepsake_types::api::StoryResponse;

/// How long a slide stays up before the reel advances on its own.
pub const AUTO_ADVANCE: Duration = Duration::from_secs(5);

/// A playback session over the story set. Slides are shuffled once when the
/// session opens and the order then stays fixed; navigation wraps at both
/// ends.
pub struct StoryReel {
    stories: Vec<StoryResponse>,
    current: usize,
}

impl StoryReel {
    pub fn new(mut stories: Vec<StoryResponse>) -> Self {
        stories.shuffle(&mut rand::rng());
        Self {
            stories,
            current: 0,
        }
    }

    pub fn len(&self) -> usize {
        self.stories.len()
    }

    pub fn is_empty(&self) -> bool {
        self.stories.is_empty()
    }

    pub fn current(&self) -> Option<&StoryResponse> {
        self.stories.get(self.current)
    }

    pub fn advance(&mut self) -> Option<&StoryResponse> {
        if self.stories.is_empty() {
            return None;
        }
        self.current = (self.current + 1) % self.stories.len();
        self.current()
    }

    pub fn back(&mut self) -> Option<&StoryResponse> {
        if self.stories.is_empty() {
            return None;
        }
        self.current = self
            .current
            .checked_sub(1)
            .unwrap_or(self.stories.len() - 1);
        self.current()
    }
}
