#[cfg(test)]
#[path = "bubble_list_test.rs"]
mod tests;

use std::collections::HashMap;

use ratatui::prelude::Rect;
use ratatui::text::Line;
use ratatui::widgets::Block;
use ratatui::widgets::Paragraph;
use ratatui::Frame;

use super::Bubble;
use super::BubbleAlignment;
use crate::domain::models::Turn;
use crate::domain::models::TurnType;

struct BubbleCacheEntry {
    text_len: usize,
    ttype: TurnType,
    lines: Vec<Line<'static>>,
}

/// Renders projected turns into terminal lines. Bubbles are cached by turn
/// key and only redrawn when their text or type changes, so a streaming
/// reply only re-renders its own bubble.
#[derive(Default)]
pub struct BubbleList {
    cache: HashMap<String, BubbleCacheEntry>,
    order: Vec<String>,
    line_width: usize,
    lines_len: usize,
}

impl BubbleList {
    pub fn set_turns(&mut self, turns: &[Turn], line_width: usize) {
        if self.line_width != line_width {
            self.cache.clear();
            self.line_width = line_width;
        }

        self.order = turns.iter().map(|turn| return turn.key.to_string()).collect();
        self.cache
            .retain(|key, _| return turns.iter().any(|turn| return &turn.key == key));

        self.lines_len = turns
            .iter()
            .map(|turn| {
                if let Some(entry) = self.cache.get(&turn.key) {
                    if entry.text_len == turn.text.len() && entry.ttype == turn.ttype {
                        return entry.lines.len();
                    }
                }

                let mut align = BubbleAlignment::Left;
                if turn.is_user() {
                    align = BubbleAlignment::Right;
                }

                let lines = Bubble::new(turn, align, line_width).as_lines();
                let lines_len = lines.len();
                self.cache.insert(
                    turn.key.to_string(),
                    BubbleCacheEntry {
                        text_len: turn.text.len(),
                        ttype: turn.ttype,
                        lines,
                    },
                );

                return lines_len;
            })
            .sum();
    }

    pub fn len(&self) -> usize {
        return self.lines_len;
    }

    pub fn is_empty(&self) -> bool {
        return self.lines_len == 0;
    }

    pub fn lines(&self) -> Vec<Line<'static>> {
        return self
            .order
            .iter()
            .filter_map(|key| return self.cache.get(key))
            .flat_map(|entry| return entry.lines.to_owned())
            .collect();
    }

    pub fn render(&self, frame: &mut Frame, rect: Rect, scroll: usize) {
        frame.render_widget(
            Paragraph::new(self.lines())
                .block(Block::default())
                .scroll((u16::try_from(scroll).unwrap_or(u16::MAX), 0)),
            rect,
        );
    }
}
