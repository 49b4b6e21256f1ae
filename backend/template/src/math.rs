//! Restricted arithmetic evaluator for `[[math:...]]` tokens.
//!
//! The input is screened against a character allow-list before parsing, and
//! identifiers resolve only through a fixed table of functions and constants.
//! Anything outside that surface evaluates to `None`, which the renderer
//! turns into an empty string. Parenthesis nesting is depth-capped so crafted
//! input cannot blow the stack.

const MAX_PAREN_DEPTH: usize = 32;

/// Evaluate an expression, or reject it.
pub fn eval(expr: &str) -> Option<f64> {
    let lowered = expr.trim().to_lowercase();
    if lowered.is_empty() || !lowered.chars().all(allowed_char) {
        return None;
    }
    let tokens = tokenize(&lowered)?;
    let mut parser = Parser { tokens, pos: 0, depth: 0 };
    let value = parser.expression()?;
    if parser.pos != parser.tokens.len() || !value.is_finite() {
        return None;
    }
    Some(value)
}

/// Render an evaluated value the way templates expect: integers without a
/// fractional part, everything else with trailing zeros trimmed.
pub fn format_number(value: f64) -> String {
    if (value - value.round()).abs() < 1e-9 && value.abs() < 1e15 {
        return format!("{}", value.round() as i64);
    }
    let formatted = format!("{value:.6}");
    formatted.trim_end_matches('0').trim_end_matches('.').to_string()
}

fn allowed_char(ch: char) -> bool {
    ch.is_ascii_digit()
        || ch.is_ascii_lowercase()
        || matches!(ch, '+' | '-' | '*' | '/' | '%' | '^' | '(' | ')' | '.' | ',' | ' ')
}

#[derive(Debug, Clone, PartialEq)]
enum Token {
    Number(f64),
    Ident(String),
    Op(char),
}

fn tokenize(input: &str) -> Option<Vec<Token>> {
    let mut tokens = Vec::new();
    let chars: Vec<char> = input.chars().collect();
    let mut i = 0;
    while i < chars.len() {
        let ch = chars[i];
        if ch == ' ' {
            i += 1;
        } else if ch.is_ascii_digit() || ch == '.' {
            let start = i;
            while i < chars.len() && (chars[i].is_ascii_digit() || chars[i] == '.') {
                i += 1;
            }
            let literal: String = chars[start..i].iter().collect();
            tokens.push(Token::Number(literal.parse().ok()?));
        } else if ch.is_ascii_lowercase() {
            let start = i;
            while i < chars.len() && chars[i].is_ascii_lowercase() {
                i += 1;
            }
            tokens.push(Token::Ident(chars[start..i].iter().collect()));
        } else {
            tokens.push(Token::Op(ch));
            i += 1;
        }
    }
    Some(tokens)
}

struct Parser {
    tokens: Vec<Token>,
    pos: usize,
    depth: usize,
}

impl Parser {
    fn peek(&self) -> Option<&Token> {
        self.tokens.get(self.pos)
    }

    fn eat_op(&mut self, op: char) -> bool {
        if self.peek() == Some(&Token::Op(op)) {
            self.pos += 1;
            return true;
        }
        false
    }

    // expression := term (('+' | '-') term)*
    fn expression(&mut self) -> Option<f64> {
        let mut value = self.term()?;
        loop {
            if self.eat_op('+') {
                value += self.term()?;
            } else if self.eat_op('-') {
                value -= self.term()?;
            } else {
                return Some(value);
            }
        }
    }

    // term := unary (('*' | '/' | '%') unary)*
    fn term(&mut self) -> Option<f64> {
        let mut value = self.unary()?;
        loop {
            if self.eat_op('*') {
                value *= self.unary()?;
            } else if self.eat_op('/') {
                value /= self.unary()?;
            } else if self.eat_op('%') {
                value %= self.unary()?;
            } else {
                return Some(value);
            }
        }
    }

    fn unary(&mut self) -> Option<f64> {
        if self.eat_op('-') {
            return Some(-self.unary()?);
        }
        if self.eat_op('+') {
            return self.unary();
        }
        self.power()
    }

    // power := primary ('^' unary)?   (right associative)
    fn power(&mut self) -> Option<f64> {
        let base = self.primary()?;
        if self.eat_op('^') {
            let exponent = self.unary()?;
            return Some(base.powf(exponent));
        }
        Some(base)
    }

    fn primary(&mut self) -> Option<f64> {
        match self.peek()?.clone() {
            Token::Number(value) => {
                self.pos += 1;
                Some(value)
            }
            Token::Op('(') => {
                self.pos += 1;
                self.depth += 1;
                if self.depth > MAX_PAREN_DEPTH {
                    return None;
                }
                let value = self.expression()?;
                self.depth -= 1;
                self.eat_op(')').then_some(value)
            }
            Token::Ident(name) => {
                self.pos += 1;
                self.call(&name)
            }
            _ => None,
        }
    }

    fn call(&mut self, name: &str) -> Option<f64> {
        match name {
            "pi" => return Some(std::f64::consts::PI),
            "e" => return Some(std::f64::consts::E),
            _ => {}
        }
        if !self.eat_op('(') {
            return None;
        }
        self.depth += 1;
        if self.depth > MAX_PAREN_DEPTH {
            return None;
        }
        let first = self.expression()?;
        let value = if self.eat_op(',') {
            let second = self.expression()?;
            match name {
                "min" => first.min(second),
                "max" => first.max(second),
                "pow" => first.powf(second),
                _ => return None,
            }
        } else {
            match name {
                "abs" => first.abs(),
                "sqrt" => first.sqrt(),
                "floor" => first.floor(),
                "ceil" => first.ceil(),
                "round" => first.round(),
                _ => return None,
            }
        };
        self.depth -= 1;
        self.eat_op(')').then_some(value)
    }
}
