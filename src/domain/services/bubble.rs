#[cfg(test)]
#[path = "bubble_test.rs"]
mod tests;

use ratatui::style::Color;
use ratatui::style::Style;
use ratatui::text::Line;
use ratatui::text::Span;

use crate::domain::models::Author;
use crate::domain::models::Turn;
use crate::domain::models::TurnType;

#[derive(Debug, PartialEq, Eq)]
pub enum BubbleAlignment {
    Left,
    Right,
}

pub struct Bubble<'a> {
    alignment: BubbleAlignment,
    turn: &'a Turn,
    window_max_width: usize,
}

pub struct BubbleConfig {
    pub bubble_padding: usize,
    pub border_elements_length: usize,
    pub outer_padding_percentage: f32,
}

fn char_len(text: &str) -> usize {
    return text.chars().count();
}

fn repeat_from_subtractions(text: &str, subtractions: Vec<usize>) -> String {
    let mut iter = subtractions.into_iter();
    let first = iter.next().unwrap_or_default();
    let count = iter.fold(first, |acc, e| return acc.saturating_sub(e));

    return text.repeat(count);
}

/// Word wraps a single line to `max` characters. Words longer than a full
/// line are split.
fn wrap_line(line: &str, max: usize) -> Vec<String> {
    let mut lines = vec![];
    let mut current = String::new();

    for word in line.split(' ') {
        let word_len = char_len(word);
        let current_len = char_len(&current);

        if word_len > max {
            if !current.is_empty() {
                lines.push(current);
            }
            let chars = word.chars().collect::<Vec<char>>();
            let mut chunks = chars
                .chunks(max.max(1))
                .map(|chunk| return chunk.iter().collect::<String>())
                .collect::<Vec<String>>();
            current = chunks.pop().unwrap_or_default();
            lines.extend(chunks);
            continue;
        }

        if current.is_empty() {
            current = word.to_string();
        } else if current_len + 1 + word_len <= max {
            current = format!("{current} {word}");
        } else {
            lines.push(current);
            current = word.to_string();
        }
    }

    lines.push(current.trim_end().to_string());
    return lines;
}

impl<'a> Bubble<'a> {
    pub fn new(turn: &'a Turn, alignment: BubbleAlignment, window_max_width: usize) -> Bubble<'a> {
        return Bubble {
            alignment,
            turn,
            window_max_width,
        };
    }

    pub fn style_config() -> BubbleConfig {
        return BubbleConfig {
            // Unicode character border + padding.
            bubble_padding: 8,
            // left border + left padding + (text, not counted) + right padding + right border +
            // scrollbar.
            border_elements_length: 5,
            outer_padding_percentage: 0.04,
        };
    }

    pub fn as_lines(&self) -> Vec<Line<'static>> {
        let max_line_length = self.get_max_line_length();

        let lines = self
            .turn
            .text
            .split('\n')
            .flat_map(|line| return wrap_line(line.trim_end(), max_line_length))
            .map(|line| return self.text_to_line(line, max_line_length))
            .collect::<Vec<Line<'static>>>();

        return self.wrap_lines_in_bubble(lines, max_line_length);
    }

    fn username(&self) -> String {
        return self.turn.author.to_string();
    }

    fn text_to_line(&self, text: String, max_line_length: usize) -> Line<'static> {
        let fill = repeat_from_subtractions(" ", vec![max_line_length, char_len(&text)]);
        let formatted_line_length =
            char_len(&text) + fill.len() + Bubble::style_config().bubble_padding;

        let wrapped_spans = vec![
            self.highlight_span("│ ".to_string()),
            Span::styled(text, self.text_style()),
            self.highlight_span(format!("{fill} │")),
        ];

        let outer_bubble_padding = Span::from(repeat_from_subtractions(
            " ",
            vec![self.window_max_width, formatted_line_length],
        ));

        if self.alignment == BubbleAlignment::Left {
            let mut line_spans = wrapped_spans;
            line_spans.push(outer_bubble_padding);
            return Line::from(line_spans);
        }

        let mut line_spans = vec![outer_bubble_padding];
        line_spans.extend(wrapped_spans);
        return Line::from(line_spans);
    }

    fn get_max_line_length(&self) -> usize {
        let style_config = Bubble::style_config();
        // Add a minimum 4% of padding on the side.
        let min_bubble_padding_length = ((self.window_max_width as f32
            * style_config.outer_padding_percentage)
            .ceil()) as usize;

        // Border elements + minimum bubble padding.
        let line_border_width = style_config.border_elements_length + min_bubble_padding_length;
        let available = self.window_max_width.saturating_sub(line_border_width).max(1);

        let longest = self
            .turn
            .text
            .split('\n')
            .map(|line| return char_len(line.trim_end()))
            .max()
            .unwrap_or_default();

        return longest.min(available).max(char_len(&self.username()));
    }

    fn wrap_lines_in_bubble(
        &self,
        lines: Vec<Line<'static>>,
        max_line_length: usize,
    ) -> Vec<Line<'static>> {
        let username = self.username();
        // Add 2 for the vertical bars, then make room for the author name.
        let inner_bar = "─".repeat((max_line_length + 2).saturating_sub(char_len(&username)));
        let top_bar = format!("╭{username}{inner_bar}╮");
        let bottom_bar = format!("╰{}╯", "─".repeat(max_line_length + 2));
        let bar_bubble_padding = repeat_from_subtractions(
            " ",
            vec![
                self.window_max_width,
                max_line_length,
                Bubble::style_config().bubble_padding,
            ],
        );

        let mut res = vec![];
        if self.alignment == BubbleAlignment::Left {
            res.push(self.highlight_line(format!("{top_bar}{bar_bubble_padding}")));
            res.extend(lines);
            res.push(self.highlight_line(format!("{bottom_bar}{bar_bubble_padding}")));
        } else {
            res.push(self.highlight_line(format!("{bar_bubble_padding}{top_bar}")));
            res.extend(lines);
            res.push(self.highlight_line(format!("{bar_bubble_padding}{bottom_bar}")));
        }

        return res;
    }

    fn border_colour(&self) -> Option<Color> {
        if self.turn.ttype == TurnType::Error {
            return Some(Color::Red);
        }

        match self.turn.author {
            Author::User => return Some(Color::Blue),
            Author::Gemchat => return Some(Color::Rgb(138, 85, 63)), // Brown
            Author::Model => return None,
        }
    }

    fn text_style(&self) -> Style {
        if self.turn.ttype == TurnType::Error {
            return Style {
                fg: Some(Color::Red),
                ..Style::default()
            };
        }

        return Style::default();
    }

    fn highlight_span(&self, text: String) -> Span<'static> {
        if let Some(colour) = self.border_colour() {
            return Span::styled(
                text,
                Style {
                    fg: Some(colour),
                    ..Style::default()
                },
            );
        }

        return Span::from(text);
    }

    fn highlight_line(&self, text: String) -> Line<'static> {
        return Line::from(self.highlight_span(text));
    }
}
