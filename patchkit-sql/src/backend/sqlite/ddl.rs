//! Edits one column definition of the `CREATE TABLE` statement SQLite keeps
//! in `sqlite_master`. Everything else in the statement is kept as written.

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(super) enum Edit<'a> {
    Default(&'a str),
    NotNull,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Kind {
    Word,
    Quoted,
    Open,
    Close,
    Comma,
}

#[derive(Debug, Clone, Copy)]
struct Token {
    kind: Kind,
    start: usize,
    end: usize,
}

const TABLE_CONSTRAINTS: [&str; 5] = ["CONSTRAINT", "PRIMARY", "UNIQUE", "CHECK", "FOREIGN"];

/// The statement with `edit` applied to `column`, `None` when the column
/// definition cannot be located.
pub(super) fn rewrite_column(sql: &str, column: &str, edit: Edit<'_>) -> Option<String> {
    let tokens = tokenize(sql)?;
    let open = tokens.iter().position(|t| t.kind == Kind::Open)?;

    let mut depth = 0;
    let mut start = open + 1;
    let mut definition = None;

    for (index, token) in tokens.iter().enumerate().skip(open + 1) {
        let item_end = match token.kind {
            Kind::Open => {
                depth += 1;
                continue;
            }
            Kind::Close if depth > 0 => {
                depth -= 1;
                continue;
            }
            Kind::Close => true,
            Kind::Comma if depth == 0 => false,
            _ => continue,
        };

        let item = &tokens[start..index];
        if defines(sql, item, column) {
            definition = Some(item);
            break;
        }

        if item_end {
            break;
        }

        start = index + 1;
    }

    let item = definition?;
    let end = item.last()?.end;

    match edit {
        Edit::Default(default) => {
            let clause = format!(" DEFAULT {}", render_default(default));

            let Some((from, to)) = default_clause(sql, item) else {
                return Some(format!("{}{clause}{}", &sql[..end], &sql[end..]));
            };

            Some(format!(
                "{}{}{clause}{}",
                sql[..from].trim_end(),
                &sql[to..end],
                &sql[end..]
            ))
        }
        Edit::NotNull => {
            let already = item
                .windows(2)
                .any(|pair| is_word(sql, pair[0], "NOT") && is_word(sql, pair[1], "NULL"));

            if already {
                return Some(sql.to_owned());
            }

            Some(format!("{} NOT NULL{}", &sql[..end], &sql[end..]))
        }
    }
}

/// Renders a default so it can follow `DEFAULT` in a column definition.
fn render_default(default: &str) -> String {
    let trimmed = default.trim();

    if ["CURRENT_TIMESTAMP", "CURRENT_DATE", "CURRENT_TIME"]
        .iter()
        .any(|keyword| trimmed.eq_ignore_ascii_case(keyword))
    {
        return trimmed.to_owned();
    }

    format!("({trimmed})")
}

fn defines(sql: &str, item: &[Token], column: &str) -> bool {
    let Some(first) = item.first() else {
        return false;
    };

    if first.kind == Kind::Word
        && TABLE_CONSTRAINTS
            .iter()
            .any(|keyword| is_word(sql, *first, keyword))
    {
        return false;
    }

    matches!(first.kind, Kind::Word | Kind::Quoted)
        && unquote(&sql[first.start..first.end]).eq_ignore_ascii_case(column)
}

/// Byte range of an existing `[CONSTRAINT name] DEFAULT expr` clause.
fn default_clause(sql: &str, item: &[Token]) -> Option<(usize, usize)> {
    let mut depth = 0;
    let mut at = None;

    for (index, token) in item.iter().enumerate().skip(1) {
        match token.kind {
            Kind::Open => depth += 1,
            Kind::Close => depth -= 1,
            Kind::Word if depth == 0 && is_word(sql, *token, "DEFAULT") => {
                at = Some(index);
                break;
            }
            _ => {}
        }
    }

    let at = at?;
    let value = at + 1;
    let first = item.get(value)?;

    let last = match first.kind {
        Kind::Open => {
            let mut depth = 0;
            let mut close = None;

            for (index, token) in item.iter().enumerate().skip(value) {
                match token.kind {
                    Kind::Open => depth += 1,
                    Kind::Close => {
                        depth -= 1;
                        if depth == 0 {
                            close = Some(index);
                            break;
                        }
                    }
                    _ => {}
                }
            }

            close?
        }
        Kind::Word if matches!(&sql[first.start..first.end], "+" | "-") => value + 1,
        Kind::Word
            if is_word(sql, *first, "X")
                && item
                    .get(value + 1)
                    .is_some_and(|next| next.kind == Kind::Quoted && next.start == first.end) =>
        {
            value + 1
        }
        _ => value,
    };

    let from = match at.checked_sub(2).map(|index| item[index]) {
        Some(token) if is_word(sql, token, "CONSTRAINT") => token.start,
        _ => item[at].start,
    };

    Some((from, item.get(last)?.end))
}

fn is_word(sql: &str, token: Token, word: &str) -> bool {
    token.kind == Kind::Word && sql[token.start..token.end].eq_ignore_ascii_case(word)
}

fn unquote(text: &str) -> String {
    let mut chars = text.chars();

    let close = match chars.next() {
        Some('"') => '"',
        Some('`') => '`',
        Some('\'') => '\'',
        Some('[') => return text[1..text.len() - 1].to_owned(),
        _ => return text.to_owned(),
    };

    let inner = &text[1..text.len() - 1];
    let doubled = format!("{close}{close}");

    inner.replace(&doubled, &close.to_string())
}

fn tokenize(sql: &str) -> Option<Vec<Token>> {
    let bytes = sql.as_bytes();
    let mut tokens = Vec::new();
    let mut i = 0;

    while i < bytes.len() {
        let start = i;

        let kind = match bytes[i] {
            b if b.is_ascii_whitespace() => {
                i += 1;
                continue;
            }
            b'-' if bytes.get(i + 1) == Some(&b'-') => {
                while i < bytes.len() && bytes[i] != b'\n' {
                    i += 1;
                }
                continue;
            }
            b'/' if bytes.get(i + 1) == Some(&b'*') => {
                let close = sql[i + 2..].find("*/")?;
                i += close + 4;
                continue;
            }
            b'(' => {
                i += 1;
                Kind::Open
            }
            b')' => {
                i += 1;
                Kind::Close
            }
            b',' => {
                i += 1;
                Kind::Comma
            }
            b'[' => {
                i += sql[i..].find(']')? + 1;
                Kind::Quoted
            }
            quote @ (b'\'' | b'"' | b'`') => {
                i += 1;
                loop {
                    match bytes.get(i) {
                        None => return None,
                        Some(&b) if b == quote && bytes.get(i + 1) == Some(&quote) => i += 2,
                        Some(&b) if b == quote => {
                            i += 1;
                            break;
                        }
                        Some(_) => i += 1,
                    }
                }
                Kind::Quoted
            }
            _ => {
                while i < bytes.len() && !delimits(bytes[i]) {
                    i += 1;
                }
                Kind::Word
            }
        };

        tokens.push(Token {
            kind,
            start,
            end: i,
        });
    }

    Some(tokens)
}

fn delimits(b: u8) -> bool {
    b.is_ascii_whitespace() || matches!(b, b'(' | b')' | b',' | b'\'' | b'"' | b'`' | b'[')
}

#[cfg(test)]
mod tests {
    use super::*;

    const PAYMENT: &str = r#"CREATE TABLE payment (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    method TEXT COLLATE NOCASE NOT NULL,
    "value" REAL CHECK ("value" > 0),
    settled BOOLEAN, -- filled later
    doubled REAL GENERATED ALWAYS AS ("value" * 2) VIRTUAL,
    CONSTRAINT method_known CHECK (method IN ('cash', 'card'))
)"#;

    #[test]
    fn default_is_appended_to_the_column_only() {
        let sql = rewrite_column(PAYMENT, "settled", Edit::Default("0")).unwrap();

        assert!(sql.contains("settled BOOLEAN DEFAULT (0), -- filled later"));
        assert!(sql.contains("method TEXT COLLATE NOCASE NOT NULL,"));
        assert!(sql.contains(r#"CHECK ("value" > 0)"#));
        assert!(sql.contains("CONSTRAINT method_known CHECK (method IN ('cash', 'card'))"));
        assert!(sql.contains("AUTOINCREMENT"));
    }

    #[test]
    fn existing_default_is_replaced() {
        let sql = "CREATE TABLE sale (id INTEGER, status TEXT DEFAULT 'open' NOT NULL, total REAL DEFAULT (-1))";

        assert_eq!(
            rewrite_column(sql, "status", Edit::Default("'draft'")).unwrap(),
            "CREATE TABLE sale (id INTEGER, status TEXT NOT NULL DEFAULT ('draft'), total REAL DEFAULT (-1))"
        );
        assert_eq!(
            rewrite_column(sql, "total", Edit::Default("0")).unwrap(),
            "CREATE TABLE sale (id INTEGER, status TEXT DEFAULT 'open' NOT NULL, total REAL DEFAULT (0))"
        );

        let named = "CREATE TABLE sale (id INTEGER, total REAL CONSTRAINT zero DEFAULT - 1 CHECK (total <> 2))";
        assert_eq!(
            rewrite_column(named, "total", Edit::Default("0")).unwrap(),
            "CREATE TABLE sale (id INTEGER, total REAL CHECK (total <> 2) DEFAULT (0))"
        );
    }

    #[test]
    fn not_null_is_added_once() {
        let sql = rewrite_column(PAYMENT, r#"value"#, Edit::NotNull).unwrap();
        assert!(sql.contains(r#""value" REAL CHECK ("value" > 0) NOT NULL,"#));

        assert_eq!(rewrite_column(PAYMENT, "method", Edit::NotNull).unwrap(), PAYMENT);
    }

    #[test]
    fn constraints_and_unknown_columns_are_not_definitions() {
        assert_eq!(rewrite_column(PAYMENT, "check", Edit::NotNull), None);
        assert_eq!(rewrite_column(PAYMENT, "missing", Edit::NotNull), None);
        assert_eq!(rewrite_column("CREATE TABLE broken (id 'INTEGER", "id", Edit::NotNull), None);
    }

    #[test]
    fn defaults_are_parenthesized_except_keywords() {
        assert_eq!(render_default("0"), "(0)");
        assert_eq!(render_default("'draft'"), "('draft')");
        assert_eq!(render_default("current_timestamp"), "current_timestamp");
    }
}
