//! Piezo speaker driver with a non-blocking note queue.
//!
//! Jingles are short fixed note sequences.  `play_*` queues the notes;
//! `update(now_ms)` advances the queue from the control loop, starting and
//! stopping the LEDC tone as note boundaries pass.  Nothing here blocks,
//! so a jingle never stretches a control-loop tick.

use heapless::Vec;

use crate::drivers::hw_init;

#[derive(Debug, Clone, Copy)]
struct Note {
    freq_hz: u32,
    duration_ms: u32,
}

const MAX_NOTES: usize = 4;

pub struct Speaker {
    queue: Vec<Note, MAX_NOTES>,
    /// Index of the note currently sounding, if any.
    playing: Option<usize>,
    note_started_ms: u32,
}

impl Speaker {
    pub fn new() -> Self {
        Self {
            queue: Vec::new(),
            playing: None,
            note_started_ms: 0,
        }
    }

    /// Two rising beeps for a confirmed crossing.
    pub fn play_success(&mut self, now_ms: u32) {
        self.queue.clear();
        let _ = self.queue.push(Note {
            freq_hz: 800,
            duration_ms: 50,
        });
        let _ = self.queue.push(Note {
            freq_hz: 1050,
            duration_ms: 100,
        });
        self.start_note(0, now_ms);
    }

    /// Advance the note queue.  Call once per control-loop tick.
    pub fn update(&mut self, now_ms: u32) {
        let Some(idx) = self.playing else {
            return;
        };
        let note = self.queue[idx];
        if now_ms.wrapping_sub(self.note_started_ms) < note.duration_ms {
            return;
        }
        let next = idx + 1;
        if next < self.queue.len() {
            self.start_note(next, now_ms);
        } else {
            hw_init::tone_stop();
            self.playing = None;
            self.queue.clear();
        }
    }

    pub fn is_playing(&self) -> bool {
        self.playing.is_some()
    }

    fn start_note(&mut self, idx: usize, now_ms: u32) {
        hw_init::tone_start(self.queue[idx].freq_hz);
        self.playing = Some(idx);
        self.note_started_ms = now_ms;
    }
}

impl Default for Speaker {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn success_jingle_runs_to_completion() {
        let mut s = Speaker::new();
        s.play_success(0);
        assert!(s.is_playing());

        // First note (50 ms) still sounding.
        s.update(40);
        assert!(s.is_playing());

        // Past the first note boundary: second note starts.
        s.update(60);
        assert!(s.is_playing());

        // Second note (100 ms from its start at t=60) ends.
        s.update(160);
        assert!(!s.is_playing());
    }

    #[test]
    fn update_is_noop_when_idle() {
        let mut s = Speaker::new();
        s.update(12345);
        assert!(!s.is_playing());
    }

    #[test]
    fn replay_restarts_the_queue() {
        let mut s = Speaker::new();
        s.play_success(0);
        s.update(200);
        assert!(!s.is_playing());
        s.play_success(300);
        assert!(s.is_playing());
    }
}
