//! Conversion of LaTeX math into Typst math markup.
//!
//! Generators write equations in LaTeX, which Typst cannot typeset directly.
//! The supported subset covers what shows up in study material: fractions,
//! roots, scripts, Greek letters, the common operators, relations and arrows,
//! named functions, font and accent commands, `\text`, `\left`/`\right`, and
//! the matrix, `cases` and `aligned` environments. Anything else is an
//! error, and the caller shows the equation's source instead.

use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum LatexError {
    #[error("unsupported command `\\{0}`")]
    UnsupportedCommand(String),

    #[error("unsupported environment `{0}`")]
    UnsupportedEnvironment(String),

    #[error("environment `{0}` is not closed")]
    UnclosedEnvironment(String),

    #[error("`{0}` is missing an argument")]
    MissingArgument(String),

    #[error("unbalanced braces")]
    UnbalancedBraces,
}

/// Convert LaTeX math source to the body of a Typst equation.
pub fn to_typst(latex: &str) -> Result<String, LatexError> {
    Converter { src: latex, pos: 0 }.group(false)
}

struct Converter<'a> {
    src: &'a str,
    pos: usize,
}

/// Typst output under construction. Adjacent identifiers need a space
/// between them or Typst reads them as one multi-letter name.
#[derive(Default)]
struct Output {
    text: String,
    after_word: bool,
}

impl Output {
    fn word(&mut self, atom: &str) {
        if atom.is_empty() {
            return;
        }
        if self.after_word {
            self.text.push(' ');
        }
        self.text.push_str(atom);
        self.after_word = true;
    }

    fn symbol(&mut self, atom: &str) {
        // `f(x)` after a name would be a call, `x.y` a field access
        if self.after_word && atom.starts_with(['(', '[', '.']) {
            self.text.push(' ');
        }
        self.text.push_str(atom);
        self.after_word = false;
    }

    fn space(&mut self) {
        if !self.text.is_empty() && !self.text.ends_with(' ') {
            self.text.push(' ');
        }
        self.after_word = false;
    }

    /// Attach a sub- or superscript to whatever precedes it.
    fn script(&mut self, marker: char, arg: &str) {
        let kept = self.text.trim_end().len();
        self.text.truncate(kept);
        self.text.push(marker);
        self.text.push('(');
        self.text.push_str(arg);
        self.text.push(')');
        self.after_word = true;
    }

    fn linebreak(&mut self) {
        self.space();
        self.text.push_str("\\ ");
    }
}

impl<'a> Converter<'a> {
    fn peek(&self) -> Option<char> {
        self.src[self.pos..].chars().next()
    }

    fn bump(&mut self) -> Option<char> {
        let c = self.peek()?;
        self.pos += c.len_utf8();
        Some(c)
    }

    fn skip_whitespace(&mut self) {
        while self.peek().is_some_and(char::is_whitespace) {
            self.bump();
        }
    }

    /// Convert up to the end of input, or through the closing brace when
    /// `closed` is set.
    fn group(&mut self, closed: bool) -> Result<String, LatexError> {
        let mut out = Output::default();
        loop {
            match self.peek() {
                None if closed => return Err(LatexError::UnbalancedBraces),
                None => break,
                Some('}') if closed => {
                    self.bump();
                    break;
                }
                Some(_) => self.atom(&mut out)?,
            }
        }
        Ok(out.text.trim().to_string())
    }

    fn atom(&mut self, out: &mut Output) -> Result<(), LatexError> {
        let Some(c) = self.bump() else {
            return Ok(());
        };
        match c {
            '}' => return Err(LatexError::UnbalancedBraces),
            '{' => {
                let inner = self.group(true)?;
                out.word(&inner);
            }
            '\\' => self.command(out)?,
            '^' | '_' => {
                let arg = self.argument(&c.to_string())?;
                out.script(c, &arg);
            }
            '~' => out.space(),
            c if c.is_whitespace() => out.space(),
            c if c.is_alphabetic() => out.word(c.encode_utf8(&mut [0; 4])),
            '/' => out.symbol("\\/"),
            '"' | '#' | '@' | ',' | ';' | '$' => out.symbol(&format!("\\{c}")),
            c => out.symbol(c.encode_utf8(&mut [0; 4])),
        }
        Ok(())
    }

    /// A braced group or a single token, converted.
    fn argument(&mut self, command: &str) -> Result<String, LatexError> {
        self.skip_whitespace();
        match self.peek() {
            None | Some('}') => Err(LatexError::MissingArgument(command.to_string())),
            Some('{') => {
                self.bump();
                self.group(true)
            }
            Some(_) => {
                let mut out = Output::default();
                self.atom(&mut out)?;
                Ok(out.text)
            }
        }
    }

    /// A braced group or a single character, unconverted.
    fn raw_argument(&mut self, command: &str) -> Result<&'a str, LatexError> {
        self.skip_whitespace();
        let src = self.src;
        let start = self.pos;
        match self.bump() {
            None | Some('}') => Err(LatexError::MissingArgument(command.to_string())),
            Some('{') => {
                let mut depth = 1;
                while let Some(c) = self.bump() {
                    match c {
                        '{' => depth += 1,
                        '}' => {
                            depth -= 1;
                            if depth == 0 {
                                return Ok(&src[start + 1..self.pos - 1]);
                            }
                        }
                        '\\' => {
                            self.bump();
                        }
                        _ => {}
                    }
                }
                Err(LatexError::UnbalancedBraces)
            }
            Some(_) => Ok(&src[start..self.pos]),
        }
    }

    /// The `[...]` argument of `\sqrt[n]{x}`, if present.
    fn optional_argument(&mut self) -> Result<Option<String>, LatexError> {
        self.skip_whitespace();
        if self.peek() != Some('[') {
            return Ok(None);
        }
        self.bump();
        let src = self.src;
        let rest = &src[self.pos..];
        let end = rest.find(']').ok_or(LatexError::UnbalancedBraces)?;
        self.pos += end + 1;
        to_typst(&rest[..end]).map(Some)
    }

    fn command_name(&mut self) -> Result<String, LatexError> {
        match self.peek() {
            Some(c) if c.is_ascii_alphabetic() => {
                let start = self.pos;
                while self.peek().is_some_and(|c| c.is_ascii_alphabetic()) {
                    self.bump();
                }
                Ok(self.src[start..self.pos].to_string())
            }
            Some(c) => {
                self.bump();
                Ok(c.to_string())
            }
            None => Err(LatexError::UnsupportedCommand(String::new())),
        }
    }

    fn command(&mut self, out: &mut Output) -> Result<(), LatexError> {
        let name = self.command_name()?;
        match name.as_str() {
            "frac" | "dfrac" | "tfrac" | "cfrac" => {
                let num = self.argument(&name)?;
                let den = self.argument(&name)?;
                out.word(&format!("frac({num}, {den})"));
            }
            "binom" => {
                let n = self.argument(&name)?;
                let k = self.argument(&name)?;
                out.word(&format!("binom({n}, {k})"));
            }
            "sqrt" => {
                let index = self.optional_argument()?;
                let body = self.argument(&name)?;
                match index {
                    Some(index) => out.word(&format!("root({index}, {body})")),
                    None => out.word(&format!("sqrt({body})")),
                }
            }
            "text" | "textrm" | "textnormal" | "mbox" => {
                let text = self.raw_argument(&name)?;
                out.word(&string_literal(text));
            }
            "textbf" => {
                let text = self.raw_argument(&name)?;
                out.word(&format!("bold({})", string_literal(text)));
            }
            "textit" => {
                let text = self.raw_argument(&name)?;
                out.word(&format!("italic({})", string_literal(text)));
            }
            "operatorname" => {
                let text = self.raw_argument(&name)?;
                out.word(&format!("op({})", string_literal(text)));
            }
            "begin" => self.environment(out)?,
            "end" => {
                let env = self.raw_argument(&name)?;
                return Err(LatexError::UnsupportedEnvironment(env.to_string()));
            }
            "left" | "right" | "big" | "Big" | "bigg" | "Bigg" | "bigl" | "bigr" | "Bigl"
            | "Bigr" => {
                self.skip_whitespace();
                if self.peek() == Some('.') {
                    self.bump();
                }
            }
            "displaystyle" | "textstyle" | "limits" | "nolimits" | "!" => {}
            "\\" => out.linebreak(),
            " " => out.space(),
            "," => out.word("thin"),
            ";" | ":" | ">" => out.word("med"),
            "quad" => out.word("quad"),
            "qquad" => out.word("wide"),
            "{" | "}" | "$" | "_" | "&" | "#" => out.symbol(&format!("\\{name}")),
            "%" => out.symbol("%"),
            "|" => out.word("‖"),
            "prime" => out.symbol("'"),
            _ => {
                if let Some(wrapper) = style(&name) {
                    let body = self.argument(&name)?;
                    out.word(&format!("{wrapper}({body})"));
                } else if let Some(glyph) = symbol(&name) {
                    out.word(glyph);
                } else {
                    return Err(LatexError::UnsupportedCommand(name));
                }
            }
        }
        Ok(())
    }

    fn environment(&mut self, out: &mut Output) -> Result<(), LatexError> {
        let name = self.raw_argument("begin")?.to_string();
        let end = format!("\\end{{{name}}}");
        let src = self.src;
        let rest = &src[self.pos..];
        let len = rest
            .find(&end)
            .ok_or_else(|| LatexError::UnclosedEnvironment(name.clone()))?;
        let body = &rest[..len];
        self.pos += len + end.len();

        let mut rows = Vec::new();
        for row in split_top_level(body, Separator::Row) {
            let cells = split_top_level(row, Separator::Cell)
                .into_iter()
                .map(to_typst)
                .collect::<Result<Vec<_>, _>>()?;
            rows.push(cells);
        }
        // A trailing `\\` leaves an empty last row
        if rows.last().is_some_and(|row| row.iter().all(String::is_empty)) {
            rows.pop();
        }

        let matrix_delim = match name.as_str() {
            "matrix" => Some("#none"),
            "pmatrix" => Some("\"(\""),
            "bmatrix" => Some("\"[\""),
            "Bmatrix" => Some("\"{\""),
            "vmatrix" => Some("\"|\""),
            "Vmatrix" => Some("\"||\""),
            _ => None,
        };

        if let Some(delim) = matrix_delim {
            let rows: Vec<String> = rows.iter().map(|row| row.join(", ")).collect();
            out.word(&format!("mat(delim: {delim}, {})", rows.join("; ")));
            return Ok(());
        }

        match name.as_str() {
            "cases" => {
                let rows: Vec<String> = rows.iter().map(|row| row.join(" & ")).collect();
                out.word(&format!("cases({})", rows.join(", ")));
            }
            "aligned" | "align" | "align*" | "gathered" | "gather" | "gather*" | "split"
            | "equation" | "equation*" => {
                for (i, row) in rows.iter().enumerate() {
                    if i > 0 {
                        out.linebreak();
                    }
                    out.symbol(&row.join(" &"));
                }
                out.after_word = true;
            }
            _ => return Err(LatexError::UnsupportedEnvironment(name)),
        }
        Ok(())
    }
}

#[derive(Clone, Copy, PartialEq, Eq)]
enum Separator {
    Row,
    Cell,
}

/// Split an environment body on `\\` or `&` outside braces.
fn split_top_level(body: &str, separator: Separator) -> Vec<&str> {
    let mut parts = Vec::new();
    let mut depth = 0usize;
    let mut start = 0;
    let mut chars = body.char_indices().peekable();

    while let Some((i, c)) = chars.next() {
        match c {
            '{' => depth += 1,
            '}' => depth = depth.saturating_sub(1),
            '\\' => {
                let escaped = chars.next();
                if separator == Separator::Row
                    && depth == 0
                    && matches!(escaped, Some((_, '\\')))
                {
                    parts.push(&body[start..i]);
                    start = i + 2;
                }
            }
            '&' if separator == Separator::Cell && depth == 0 => {
                parts.push(&body[start..i]);
                start = i + 1;
            }
            _ => {}
        }
    }
    parts.push(&body[start..]);
    parts
}

fn string_literal(text: &str) -> String {
    format!("\"{}\"", text.replace('\\', "\\\\").replace('"', "\\\""))
}

/// Font and accent commands, mapped to the Typst function wrapping their argument.
fn style(name: &str) -> Option<&'static str> {
    Some(match name {
        "mathrm" => "upright",
        "mathbf" | "boldsymbol" | "bm" => "bold",
        "mathit" => "italic",
        "mathbb" => "bb",
        "mathcal" => "cal",
        "mathfrak" => "frak",
        "mathsf" => "sans",
        "mathtt" => "mono",
        "vec" | "overrightarrow" => "arrow",
        "hat" | "widehat" => "hat",
        "tilde" | "widetilde" => "tilde",
        "bar" => "macron",
        "dot" => "dot",
        "ddot" => "dot.double",
        "overline" => "overline",
        "underline" => "underline",
        _ => return None,
    })
}

fn symbol(name: &str) -> Option<&str> {
    Some(match name {
        // Greek
        "alpha" => "alpha",
        "beta" => "beta",
        "gamma" => "gamma",
        "delta" => "delta",
        "epsilon" => "epsilon.alt",
        "varepsilon" => "epsilon",
        "zeta" => "zeta",
        "eta" => "eta",
        "theta" => "theta",
        "vartheta" => "theta.alt",
        "iota" => "iota",
        "kappa" => "kappa",
        "lambda" => "lambda",
        "mu" => "mu",
        "nu" => "nu",
        "xi" => "xi",
        "pi" => "pi",
        "varpi" => "pi.alt",
        "rho" => "rho",
        "varrho" => "rho.alt",
        "sigma" => "sigma",
        "varsigma" => "sigma.alt",
        "tau" => "tau",
        "upsilon" => "upsilon",
        "phi" => "phi.alt",
        "varphi" => "phi",
        "chi" => "chi",
        "psi" => "psi",
        "omega" => "omega",
        "Gamma" => "Gamma",
        "Delta" => "Delta",
        "Theta" => "Theta",
        "Lambda" => "Lambda",
        "Xi" => "Xi",
        "Pi" => "Pi",
        "Sigma" => "Sigma",
        "Upsilon" => "Upsilon",
        "Phi" => "Phi",
        "Psi" => "Psi",
        "Omega" => "Omega",

        // Named functions, predefined in Typst under the same names
        "sin" | "cos" | "tan" | "cot" | "sec" | "csc" | "arcsin" | "arccos" | "arctan"
        | "sinh" | "cosh" | "tanh" | "coth" | "log" | "ln" | "lg" | "exp" | "lim" | "liminf"
        | "limsup" | "max" | "min" | "sup" | "inf" | "det" | "gcd" | "deg" | "dim" | "ker"
        | "arg" | "Pr" => name,
        "bmod" => "mod",

        // Large operators
        "sum" => "sum",
        "prod" => "product",
        "coprod" => "∐",
        "int" => "integral",
        "iint" => "∬",
        "iiint" => "∭",
        "oint" => "∮",
        "bigcup" => "⋃",
        "bigcap" => "⋂",

        // Binary operators
        "cdot" | "cdotp" => "⋅",
        "times" => "×",
        "div" => "÷",
        "pm" => "±",
        "mp" => "∓",
        "ast" => "∗",
        "star" => "⋆",
        "circ" => "∘",
        "bullet" => "•",
        "oplus" => "⊕",
        "otimes" => "⊗",
        "cup" => "∪",
        "cap" => "∩",
        "setminus" => "∖",
        "land" | "wedge" => "∧",
        "lor" | "vee" => "∨",

        // Relations
        "leq" | "le" => "≤",
        "geq" | "ge" => "≥",
        "neq" | "ne" => "≠",
        "approx" => "≈",
        "equiv" => "≡",
        "sim" => "∼",
        "simeq" => "≃",
        "cong" => "≅",
        "propto" => "∝",
        "ll" => "≪",
        "gg" => "≫",
        "in" => "∈",
        "notin" => "∉",
        "ni" => "∋",
        "subset" => "⊂",
        "subseteq" => "⊆",
        "supset" => "⊃",
        "supseteq" => "⊇",
        "perp" => "⊥",
        "parallel" => "∥",
        "mid" | "vert" | "lvert" | "rvert" => "|",
        "Vert" | "lVert" | "rVert" => "‖",

        // Arrows
        "to" | "rightarrow" => "→",
        "leftarrow" | "gets" => "←",
        "leftrightarrow" => "↔",
        "Rightarrow" => "⇒",
        "Leftarrow" => "⇐",
        "Leftrightarrow" | "iff" => "⇔",
        "implies" => "⟹",
        "impliedby" => "⟸",
        "longrightarrow" => "⟶",
        "longleftarrow" => "⟵",
        "mapsto" => "↦",
        "uparrow" => "↑",
        "downarrow" => "↓",

        // Delimiters
        "langle" => "⟨",
        "rangle" => "⟩",
        "lfloor" => "⌊",
        "rfloor" => "⌋",
        "lceil" => "⌈",
        "rceil" => "⌉",

        // Miscellaneous
        "infty" => "∞",
        "partial" => "∂",
        "nabla" => "∇",
        "forall" => "∀",
        "exists" => "∃",
        "nexists" => "∄",
        "neg" | "lnot" => "¬",
        "emptyset" | "varnothing" => "∅",
        "angle" => "∠",
        "degree" => "°",
        "triangle" => "△",
        "therefore" => "∴",
        "because" => "∵",
        "ldots" | "dots" => "…",
        "cdots" => "⋯",
        "vdots" => "⋮",
        "ddots" => "⋱",
        "hbar" => "ħ",
        "ell" => "ℓ",
        "Re" => "ℜ",
        "Im" => "ℑ",
        "aleph" => "ℵ",
        _ => return None,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn convert(latex: &str) -> String {
        to_typst(latex).unwrap()
    }

    #[test]
    fn fractions_and_roots() {
        assert_eq!(convert("\\frac{1}{2}"), "frac(1, 2)");
        assert_eq!(convert("\\dfrac{a+b}{c}"), "frac(a+b, c)");
        assert_eq!(convert("\\sqrt{y}"), "sqrt(y)");
        assert_eq!(convert("\\sqrt[3]{x}"), "root(3, x)");
        assert_eq!(convert("\\frac12"), "frac(1, 2)");
    }

    #[test]
    fn scripts() {
        assert_eq!(convert("x^{2} + \\sqrt{y}"), "x^(2) + sqrt(y)");
        assert_eq!(convert("E = mc^2"), "E = m c^(2)");
        assert_eq!(convert("a_{ij}"), "a_(i j)");
        assert_eq!(convert("\\sum_{i=1}^{n} i"), "sum_(i=1)^(n) i");
    }

    #[test]
    fn adjacent_letters_are_separated() {
        assert_eq!(convert("ab"), "a b");
        assert_eq!(convert("2\\pi r"), "2pi r");
        assert_eq!(convert("x\\alpha"), "x alpha");
    }

    #[test]
    fn greek_and_operators() {
        assert_eq!(convert("\\alpha + \\beta"), "alpha + beta");
        assert_eq!(convert("a \\cdot b \\leq c"), "a ⋅ b ≤ c");
        assert_eq!(convert("\\varepsilon \\to 0"), "epsilon → 0");
    }

    #[test]
    fn named_functions_are_not_calls() {
        assert_eq!(convert("\\sin(x)"), "sin (x)");
        assert_eq!(convert("f(x)"), "f (x)");
    }

    #[test]
    fn typst_specials_are_escaped() {
        assert_eq!(convert("v=d/t"), "v=d\\/t");
        assert_eq!(convert("f(a, b)"), "f (a\\, b)");
        assert_eq!(convert("\\{x\\}"), "\\{x\\}");
    }

    #[test]
    fn text_and_styles() {
        assert_eq!(convert("\\text{if } x"), "\"if \" x");
        assert_eq!(convert("\\mathbf{v}"), "bold(v)");
        assert_eq!(convert("\\vec{F}"), "arrow(F)");
        assert_eq!(convert("\\operatorname{sgn} x"), "op(\"sgn\") x");
    }

    #[test]
    fn sized_delimiters() {
        assert_eq!(convert("\\left( x \\right)"), "( x )");
        assert_eq!(convert("\\left. x \\right|"), "x |");
    }

    #[test]
    fn environments() {
        assert_eq!(
            convert("\\begin{pmatrix} a & b \\\\ c & d \\end{pmatrix}"),
            "mat(delim: \"(\", a, b; c, d)"
        );
        assert_eq!(
            convert("|x| = \\begin{cases} x & x \\geq 0 \\\\ -x & x < 0 \\end{cases}"),
            "|x| = cases(x & x ≥ 0, -x & x < 0)"
        );
        assert_eq!(
            convert("\\begin{aligned} a &= b \\\\ c &= d \\\\ \\end{aligned}"),
            "a &= b \\ c &= d"
        );
    }

    #[test]
    fn unsupported_input() {
        assert_eq!(
            to_typst("\\foo{x}"),
            Err(LatexError::UnsupportedCommand("foo".to_string()))
        );
        assert_eq!(to_typst("{x"), Err(LatexError::UnbalancedBraces));
        assert_eq!(to_typst("x}"), Err(LatexError::UnbalancedBraces));
        assert_eq!(
            to_typst("\\frac{1}"),
            Err(LatexError::MissingArgument("frac".to_string()))
        );
        assert_eq!(
            to_typst("\\begin{tabular}x\\end{tabular}"),
            Err(LatexError::UnsupportedEnvironment("tabular".to_string()))
        );
        assert_eq!(
            to_typst("\\begin{cases} x"),
            Err(LatexError::UnclosedEnvironment("cases".to_string()))
        );
    }
}
