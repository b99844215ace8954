//! Hooks the search reports to while it runs. Nothing here affects the result
//! of a search; the default [`NullObserver`] compiles down to nothing.

use std::io::{self, BufRead, Write};

pub type ViewId = usize;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ItemStyle {
    Active,
    /// Tried and rejected, or not yet visited.
    Hidden,
    Completed,
}

pub trait SearchObserver {
    /// When false the planner skips building any trace text.
    fn enabled(&self) -> bool {
        false
    }

    fn display_text(&mut self, _line: &str) {}

    /// Opens a labeled list (goals, preconditions, candidate actions).
    fn add_item_view(&mut self, _title: &str, _items: &[String], _active: Option<usize>, _hidden: &[usize]) -> ViewId {
        0
    }

    fn add_item(&mut self, _view: ViewId, _item: &str) {}

    fn set_style(&mut self, _view: ViewId, _index: usize, _style: ItemStyle) {}

    fn clear_style(&mut self, _view: ViewId, _index: usize, _style: ItemStyle) {}

    fn remove_view(&mut self, _view: ViewId) {}

    /// Blocks until the user lets the search continue.
    fn pause(&mut self, _message: &str) {}
}

#[derive(Debug, Default, Clone, Copy)]
pub struct NullObserver;

impl SearchObserver for NullObserver {}

impl<O: SearchObserver + ?Sized> SearchObserver for &mut O {
    fn enabled(&self) -> bool {
        (**self).enabled()
    }
    fn display_text(&mut self, line: &str) {
        (**self).display_text(line)
    }
    fn add_item_view(&mut self, title: &str, items: &[String], active: Option<usize>, hidden: &[usize]) -> ViewId {
        (**self).add_item_view(title, items, active, hidden)
    }
    fn add_item(&mut self, view: ViewId, item: &str) {
        (**self).add_item(view, item)
    }
    fn set_style(&mut self, view: ViewId, index: usize, style: ItemStyle) {
        (**self).set_style(view, index, style)
    }
    fn clear_style(&mut self, view: ViewId, index: usize, style: ItemStyle) {
        (**self).clear_style(view, index, style)
    }
    fn remove_view(&mut self, view: ViewId) {
        (**self).remove_view(view)
    }
    fn pause(&mut self, message: &str) {
        (**self).pause(message)
    }
}

struct ItemView {
    title: String,
    items: Vec<String>,
    active: Option<usize>,
    hidden: Vec<usize>,
    completed: Vec<usize>,
}

impl ItemView {
    fn marker(&self, index: usize) -> char {
        if self.hidden.contains(&index) {
            'x'
        } else if self.completed.contains(&index) {
            '+'
        } else if self.active == Some(index) {
            '>'
        } else {
            ' '
        }
    }
}

/// Writes the trace as plain text. With stepping enabled every pause waits for
/// a line on `input`; answering `c` continues without further pauses.
pub struct TextObserver<W: Write, R: BufRead> {
    out: W,
    input: R,
    stepping: bool,
    views: Vec<Option<ItemView>>,
    error: Option<io::Error>,
}

impl<W: Write, R: BufRead> TextObserver<W, R> {
    pub fn new(out: W, input: R, stepping: bool) -> Self {
        Self { out, input, stepping, views: Vec::new(), error: None }
    }

    /// First write or read failure, if any. Output stops after it.
    pub fn take_error(&mut self) -> Option<io::Error> {
        self.error.take()
    }

    pub fn into_inner(self) -> W {
        self.out
    }

    fn write_line(&mut self, line: &str) {
        if self.error.is_some() {
            return;
        }
        if let Err(e) = writeln!(self.out, "{}", line) {
            self.error = Some(e);
        }
    }

    fn write_item(&mut self, view: ViewId, index: usize) {
        let line = match self.views.get(view).and_then(|v| v.as_ref()) {
            Some(v) => match v.items.get(index) {
                Some(item) => format!("  {} {} {}", v.title, v.marker(index), item),
                None => return,
            },
            None => return,
        };
        self.write_line(&line);
    }
}

impl<W: Write, R: BufRead> SearchObserver for TextObserver<W, R> {
    fn enabled(&self) -> bool {
        true
    }

    fn display_text(&mut self, line: &str) {
        self.write_line(line)
    }

    fn add_item_view(&mut self, title: &str, items: &[String], active: Option<usize>, hidden: &[usize]) -> ViewId {
        let view = ItemView {
            title: title.to_owned(),
            items: items.to_vec(),
            active,
            hidden: hidden.to_vec(),
            completed: Vec::new(),
        };
        let lines: Vec<String> = std::iter::once(format!("[{}]", title))
            .chain(view.items.iter().enumerate().map(|(i, item)| format!("  {} {}", view.marker(i), item)))
            .collect();
        self.views.push(Some(view));
        for line in lines {
            self.write_line(&line);
        }
        self.views.len() - 1
    }

    fn add_item(&mut self, view: ViewId, item: &str) {
        let index = match self.views.get_mut(view).and_then(|v| v.as_mut()) {
            Some(v) => {
                v.items.push(item.to_owned());
                v.items.len() - 1
            }
            None => return,
        };
        self.write_item(view, index);
    }

    fn set_style(&mut self, view: ViewId, index: usize, style: ItemStyle) {
        if let Some(v) = self.views.get_mut(view).and_then(|v| v.as_mut()) {
            match style {
                ItemStyle::Active => v.active = Some(index),
                ItemStyle::Hidden => v.hidden.push(index),
                ItemStyle::Completed => v.completed.push(index),
            }
        }
        self.write_item(view, index);
    }

    fn clear_style(&mut self, view: ViewId, index: usize, style: ItemStyle) {
        if let Some(v) = self.views.get_mut(view).and_then(|v| v.as_mut()) {
            match style {
                ItemStyle::Active if v.active == Some(index) => v.active = None,
                ItemStyle::Active => (),
                ItemStyle::Hidden => v.hidden.retain(|i| *i != index),
                ItemStyle::Completed => v.completed.retain(|i| *i != index),
            }
        }
    }

    fn remove_view(&mut self, view: ViewId) {
        if let Some(slot) = self.views.get_mut(view) {
            *slot = None;
        }
    }

    fn pause(&mut self, message: &str) {
        if !message.is_empty() {
            self.write_line(message);
        }
        if !self.stepping || self.error.is_some() {
            return;
        }
        self.write_line("-- press enter for the next step, 'c' to run to the end --");
        if let Err(e) = self.out.flush() {
            self.error = Some(e);
            return;
        }
        let mut answer = String::new();
        match self.input.read_line(&mut answer) {
            // EOF on input means nobody is stepping anymore.
            Ok(0) => self.stepping = false,
            Ok(_) if answer.trim().eq_ignore_ascii_case("c") => self.stepping = false,
            Ok(_) => (),
            Err(e) => self.error = Some(e),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn text(observer: TextObserver<Vec<u8>, &[u8]>) -> String {
        String::from_utf8(observer.into_inner()).expect("trace is utf-8")
    }

    #[test]
    fn test_null_observer_is_disabled() {
        let mut o = NullObserver;
        assert!(!o.enabled());
        assert_eq!(o.add_item_view("Goal", &["On(A, B)".to_owned()], None, &[]), 0);
        o.pause("ignored");
    }

    #[test]
    fn test_item_view_markers() {
        let mut o = TextObserver::new(Vec::new(), &b""[..], false);
        let items = vec!["On(A, B)".to_owned(), "On(B, C)".to_owned()];
        let view = o.add_item_view("Goal", &items, None, &[1]);
        o.set_style(view, 0, ItemStyle::Active);
        o.clear_style(view, 1, ItemStyle::Hidden);
        o.set_style(view, 0, ItemStyle::Completed);
        o.add_item(view, "Clear(C)");
        o.remove_view(view);
        o.set_style(view, 0, ItemStyle::Hidden);
        assert_eq!(
            text(o),
            "[Goal]\n    On(A, B)\n  x On(B, C)\n  Goal > On(A, B)\n  Goal + On(A, B)\n  Goal   Clear(C)\n"
        );
    }

    #[test]
    fn test_stepping_skip_rest() {
        let mut o = TextObserver::new(Vec::new(), &b"\nc\n"[..], true);
        o.pause("one");
        o.pause("two");
        o.pause("three");
        let prompt = "-- press enter for the next step, 'c' to run to the end --";
        assert_eq!(text(o), format!("one\n{p}\ntwo\n{p}\nthree\n", p = prompt));
    }

    #[test]
    fn test_observer_through_reference() {
        fn report<O: SearchObserver>(mut o: O) {
            assert!(o.enabled());
            o.display_text("hello");
        }
        let mut inner = TextObserver::new(Vec::new(), &b""[..], false);
        report(&mut inner);
        assert_eq!(text(inner), "hello\n");
    }
}
