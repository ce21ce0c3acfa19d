//! Template rendering for persona prompts.

use minijinja::Environment;
use serde::Serialize;

/// Renders `template` with `context` using minijinja.
pub fn render_prompt<T: Serialize>(template: &str, context: T) -> Result<String, minijinja::Error> {
    let mut env = Environment::new();
    env.add_template("prompt", template)?;
    let tmpl = env.get_template("prompt")?;
    tmpl.render(context)
}

#[cfg(test)]
mod tests {
    use super::*;
    use minijinja::context;

    #[test]
    fn renders_named_variables() {
        let rendered = render_prompt(
            "You are {{ name }}, the room's {{ specialty }} specialist.",
            context! { name => "Mira", specialty => "structure" },
        )
        .unwrap();
        assert_eq!(rendered, "You are Mira, the room's structure specialist.");
    }

    #[test]
    fn unbalanced_tags_are_errors() {
        assert!(render_prompt("{{ name", context! { name => "x" }).is_err());
    }
}
