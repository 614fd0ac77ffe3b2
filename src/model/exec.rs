//! Field-code expansion for `Exec` command lines.

use super::Entry;
use log::warn;
use std::collections::HashMap;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ExecValue {
    Scalar(String),
    List(Vec<String>),
}

impl ExecValue {
    fn first(&self) -> Option<&str> {
        match self {
            ExecValue::Scalar(s) => Some(s.as_str()),
            ExecValue::List(items) => items.first().map(String::as_str),
        }
    }

    fn items(&self) -> Vec<String> {
        match self {
            ExecValue::Scalar(s) => vec![s.clone()],
            ExecValue::List(items) => items.clone(),
        }
    }
}

impl From<&str> for ExecValue {
    fn from(value: &str) -> Self {
        ExecValue::Scalar(value.to_string())
    }
}

impl From<String> for ExecValue {
    fn from(value: String) -> Self {
        ExecValue::Scalar(value)
    }
}

impl From<Vec<String>> for ExecValue {
    fn from(value: Vec<String>) -> Self {
        ExecValue::List(value)
    }
}

/// Values for field codes, keyed by the code letter (`'f'` for `%f`).
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ExecArgs {
    values: HashMap<char, ExecValue>,
}

impl ExecArgs {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, code: char, value: impl Into<ExecValue>) -> Self {
        self.set(code, value);
        self
    }

    pub fn set(&mut self, code: char, value: impl Into<ExecValue>) {
        self.values.insert(code, value.into());
    }

    /// Looks up a code, falling back to the other-case variant so `%f` can
    /// take the first of a `%F` list and `%F` can take a single `%f`.
    fn lookup(&self, code: char) -> Option<&ExecValue> {
        self.values.get(&code).or_else(|| {
            let other = if code.is_ascii_lowercase() {
                code.to_ascii_uppercase()
            } else {
                code.to_ascii_lowercase()
            };
            self.values.get(&other)
        })
    }
}

const LIST_CODES: [char; 4] = ['F', 'U', 'D', 'N'];
const SCALAR_CODES: [char; 10] = ['f', 'u', 'd', 'n', 'i', 'c', 'k', 'v', 'V', 'm'];

impl Entry {
    /// Splits `exec` on whitespace and substitutes field codes. When the entry
    /// wants a terminal, `terminal` (a full command prefix such as
    /// `xterm -e`) is prepended.
    pub fn generate_exec(&self, args: &ExecArgs, terminal: Option<&str>) -> Vec<String> {
        let mut tokens = Vec::new();
        for raw in self.exec.split_whitespace() {
            self.expand_token(raw, args, &mut tokens);
        }

        if self.terminal {
            match terminal.filter(|t| !t.trim().is_empty()) {
                Some(prefix) => {
                    let mut full: Vec<String> =
                        prefix.split_whitespace().map(str::to_string).collect();
                    full.append(&mut tokens);
                    tokens = full;
                }
                None => warn!(
                    "'{}' wants a terminal but no terminal emulator is configured",
                    self.name
                ),
            }
        }

        tokens
    }

    fn expand_token(&self, raw: &str, args: &ExecArgs, out: &mut Vec<String>) {
        // A bare list code expands to one argument per item.
        if let Some(code) = raw.strip_prefix('%').and_then(single_char) {
            if LIST_CODES.contains(&code) {
                if let Some(value) = args.lookup(code) {
                    out.extend(value.items().into_iter().filter(|s| !s.is_empty()));
                }
                return;
            }
            if code == 'i' && args.lookup('i').is_none() {
                if !self.icon.is_empty() {
                    out.push("--icon".to_string());
                    out.push(self.icon.clone());
                }
                return;
            }
        }

        let mut expanded = String::new();
        let mut had_code = false;
        let mut chars = raw.chars();
        while let Some(c) = chars.next() {
            if c != '%' {
                expanded.push(c);
                continue;
            }
            match chars.next() {
                Some('%') => expanded.push('%'),
                Some(code) if LIST_CODES.contains(&code) => {
                    had_code = true;
                    if let Some(value) = args.lookup(code) {
                        expanded.push_str(&value.items().join(" "));
                    }
                }
                Some(code) if SCALAR_CODES.contains(&code) => {
                    had_code = true;
                    if let Some(value) = self.scalar_for(code, args) {
                        expanded.push_str(&value);
                    }
                }
                Some(other) => {
                    had_code = true;
                    warn!("Dropping unknown field code %{} in '{}'", other, self.exec);
                }
                None => expanded.push('%'),
            }
        }

        if !had_code || !expanded.is_empty() {
            out.push(expanded);
        }
    }

    fn scalar_for(&self, code: char, args: &ExecArgs) -> Option<String> {
        if let Some(value) = args.lookup(code).and_then(ExecValue::first) {
            return Some(value.to_string());
        }
        match code {
            'i' if !self.icon.is_empty() => Some(self.icon.clone()),
            'c' => Some(self.name.clone()),
            'k' => self
                .source
                .as_ref()
                .map(|p| p.to_string_lossy().to_string()),
            _ => None,
        }
    }
}

fn single_char(s: &str) -> Option<char> {
    let mut chars = s.chars();
    let c = chars.next()?;
    chars.next().is_none().then_some(c)
}
