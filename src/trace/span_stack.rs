// Copyright 2026 Layne Penney
// SPDX-License-Identifier: AGPL-3.0-or-later

//! Bounded stack of open spans.

use std::time::Instant;

use crate::ids::SpanId;

/// Default maximum number of simultaneously open spans.
pub const DEFAULT_MAX_SPAN_DEPTH: usize = 32;

/// One open span.
#[derive(Debug, Clone)]
pub struct SpanFrame {
    pub id: SpanId,
    pub name: String,
    pub started_at: Instant,
}

/// Outcome of opening a span.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SpanStart {
    /// The span was pushed.
    Opened(SpanId),
    /// The stack was full. `first` is set once per overflow episode so the
    /// caller can emit a single diagnostic.
    Overflow { first: bool },
}

impl SpanStart {
    /// The id handed back to the caller.
    pub fn id(&self) -> SpanId {
        match self {
            Self::Opened(id) => *id,
            Self::Overflow { .. } => SpanId::overflow(),
        }
    }
}

/// Outcome of closing a span.
#[derive(Debug, Clone)]
pub enum SpanEnd {
    Closed(SpanFrame),
    /// Matched a start that overflowed; the real stack is untouched.
    Overflow,
    /// Nothing was open.
    Empty,
}

/// LIFO of open spans, oldest first.
///
/// Starts refused at capacity are counted so that their matching ends do
/// not pop spans that are still open.
#[derive(Debug)]
pub struct SpanStack {
    frames: Vec<SpanFrame>,
    max_depth: usize,
    overflowed: usize,
    overflow_reported: bool,
}

impl SpanStack {
    pub fn new(max_depth: usize) -> Self {
        Self {
            frames: Vec::new(),
            max_depth: max_depth.max(1),
            overflowed: 0,
            overflow_reported: false,
        }
    }

    pub fn push(&mut self, name: &str, now: Instant) -> SpanStart {
        if self.frames.len() >= self.max_depth {
            self.overflowed += 1;
            let first = !self.overflow_reported;
            self.overflow_reported = true;
            return SpanStart::Overflow { first };
        }

        let id = SpanId::new();
        self.frames.push(SpanFrame {
            id,
            name: name.to_string(),
            started_at: now,
        });
        SpanStart::Opened(id)
    }

    pub fn pop(&mut self) -> SpanEnd {
        if self.overflowed > 0 {
            self.overflowed -= 1;
            return SpanEnd::Overflow;
        }
        match self.frames.pop() {
            Some(frame) => {
                self.overflow_reported = false;
                SpanEnd::Closed(frame)
            }
            None => SpanEnd::Empty,
        }
    }

    /// Drop every open span, returning them oldest first.
    pub fn clear(&mut self) -> Vec<SpanFrame> {
        self.overflowed = 0;
        self.overflow_reported = false;
        std::mem::take(&mut self.frames)
    }

    pub fn current(&self) -> Option<SpanId> {
        self.frames.last().map(|frame| frame.id)
    }

    /// Open span names, oldest first.
    pub fn chain(&self) -> Vec<String> {
        self.frames.iter().map(|frame| frame.name.clone()).collect()
    }

    pub fn depth(&self) -> usize {
        self.frames.len()
    }

    pub fn max_depth(&self) -> usize {
        self.max_depth
    }

    pub fn is_empty(&self) -> bool {
        self.frames.is_empty()
    }
}
