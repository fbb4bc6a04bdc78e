//! Built-in SQL model templates
//!
//! The bodies are opaque payloads for a downstream model runner. The only
//! thing this crate understands in them is the pair of `$DELIM` / `$ID`
//! tokens; any other template syntax (`{{ ref(..) }}`, `{% for %}`, `{#- #}`)
//! is passed through untouched.

/// Token replaced with the job delimiter
pub const DELIM_TOKEN: &str = "$DELIM";

/// Token replaced with the copy identifier
pub const ID_TOKEN: &str = "$ID";

/// Stage a template belongs to, which decides where its output lands
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    /// Written to the staging subdirectory
    Staging,
    /// Written to the target root
    Mart,
}

/// A named template body
#[derive(Debug, Clone, Copy)]
pub struct SqlTemplate {
    pub name: &'static str,
    pub stage: Stage,
    pub body: &'static str,
}

/// Every template rendered for each copy
pub const TEMPLATES: [SqlTemplate; 5] = [
    SqlTemplate {
        name: "stg_customers",
        stage: Stage::Staging,
        body: include_str!("templates/stg_customers.sql"),
    },
    SqlTemplate {
        name: "stg_orders",
        stage: Stage::Staging,
        body: include_str!("templates/stg_orders.sql"),
    },
    SqlTemplate {
        name: "stg_payments",
        stage: Stage::Staging,
        body: include_str!("templates/stg_payments.sql"),
    },
    SqlTemplate {
        name: "orders",
        stage: Stage::Mart,
        body: include_str!("templates/orders.sql"),
    },
    SqlTemplate {
        name: "customers",
        stage: Stage::Mart,
        body: include_str!("templates/customers.sql"),
    },
];

/// Substitute every `$DELIM` and `$ID` token in `body`
///
/// Substitution is a single left-to-right pass, so a delimiter or identifier
/// that itself contains a token is never expanded again.
///
/// # Example
///
/// ```rust
/// use stampede_domain::synthesis::render;
///
/// let sql = render("select * from {{ ref('orders$DELIM$ID') }}", "_", "042");
/// assert_eq!(sql, "select * from {{ ref('orders_042') }}");
/// ```
pub fn render(body: &str, delimiter: &str, identifier: &str) -> String {
    let mut out = String::with_capacity(body.len() + 16);
    let mut rest = body;

    while let Some(pos) = rest.find('$') {
        out.push_str(&rest[..pos]);
        let tail = &rest[pos..];

        if let Some(after) = tail.strip_prefix(DELIM_TOKEN) {
            out.push_str(delimiter);
            rest = after;
        } else if let Some(after) = tail.strip_prefix(ID_TOKEN) {
            out.push_str(identifier);
            rest = after;
        } else {
            out.push('$');
            rest = &tail[1..];
        }
    }

    out.push_str(rest);
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_render_replaces_every_occurrence() {
        let body = "a$DELIM$ID b$DELIM$ID c$ID";
        assert_eq!(render(body, "_", "042"), "a_042 b_042 c042");
    }

    #[test]
    fn test_render_leaves_other_bytes_untouched() {
        let body = "{% set x = ['$', '$$'] %}\n{{ ref('stg_orders$DELIM$ID') }} -- $IDENT? $DELIMITER\t";
        let rendered = render(body, "-", "7");

        // `$IDENT` and `$DELIMITER` start with a token, so the prefix is replaced
        assert_eq!(
            rendered,
            "{% set x = ['$', '$$'] %}\n{{ ref('stg_orders-7') }} -- 7ENT? -ITER\t"
        );
    }

    #[test]
    fn test_render_does_not_expand_substituted_text() {
        assert_eq!(render("x$DELIM$ID", "$ID", "1"), "x$ID1");
    }

    #[test]
    fn test_render_without_tokens_is_identity() {
        for template in TEMPLATES.iter().filter(|t| t.stage == Stage::Staging) {
            assert_eq!(render(template.body, "_", "042"), template.body);
        }
    }

    #[test]
    fn test_mart_templates_reference_their_copy() {
        let orders = TEMPLATES.iter().find(|t| t.name == "orders").unwrap();
        let rendered = render(orders.body, "_", "042");

        assert!(rendered.contains("{{ ref('stg_orders_042') }}"));
        assert!(rendered.contains("{{ ref('stg_payments_042') }}"));
        assert!(rendered.contains("{% for payment_method in payment_methods -%}"));
        assert!(!rendered.contains(DELIM_TOKEN));
        assert!(!rendered.contains(ID_TOKEN));
    }

    #[test]
    fn test_template_names_are_unique() {
        let mut names: Vec<_> = TEMPLATES.iter().map(|t| t.name).collect();
        names.sort();
        names.dedup();
        assert_eq!(names.len(), TEMPLATES.len());
    }

    #[test]
    fn test_bodies_keep_their_framing_whitespace() {
        for template in &TEMPLATES {
            assert!(template.body.starts_with('\n'), "{} lost its leading newline", template.name);
            assert!(!template.body.starts_with("\n\n"), "{}", template.name);
        }

        let payments = TEMPLATES.iter().find(|t| t.name == "stg_payments").unwrap();
        assert!(payments.body.starts_with("\nwith source as (\n    \n"));
    }
}
