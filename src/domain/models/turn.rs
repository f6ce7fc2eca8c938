use super::Author;

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum TurnType {
    Normal,
    Error,
}

/// One visual bubble in the chat thread.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Turn {
    /// Stable across re-renders so rendered bubbles can be cached.
    pub key: String,
    pub author: Author,
    pub text: String,
    pub ttype: TurnType,
}

impl Turn {
    pub fn new(key: &str, author: Author, ttype: TurnType, text: &str) -> Turn {
        return Turn {
            key: key.to_string(),
            author,
            text: text.replace('\t', "  "),
            ttype,
        };
    }

    pub fn is_user(&self) -> bool {
        return self.author == Author::User;
    }
}

/// An application authored bubble (greeting, help, command feedback). Sits
/// after the first `after` exchanges and never counts as an exchange.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Notice {
    pub after: usize,
    pub author: Author,
    pub text: String,
    pub ttype: TurnType,
}

impl Notice {
    pub fn new(author: Author, text: &str) -> Notice {
        return Notice {
            after: 0,
            author,
            text: text.to_string(),
            ttype: TurnType::Normal,
        };
    }

    pub fn new_with_type(author: Author, ttype: TurnType, text: &str) -> Notice {
        return Notice {
            after: 0,
            author,
            text: text.to_string(),
            ttype,
        };
    }
}
