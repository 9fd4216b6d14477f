//! Fixed instruction templates for the model-calling stages.

use minijinja::{Environment, context};
use serde::Serialize;

/// System prompt for the report planner.
pub const REPORT_PLANNER_TEMPLATE: &str = r##"
You are an expert technical writer planning a report.

## Topic
{{ topic }}

## Required Report Structure
{{ report_structure }}

---

Using the research gathered so far, produce an outline for the report as a JSON object:

```json
{
  "title": "The report title",
  "sections": [
    { "name": "Section name", "content": "" }
  ]
}
```

**Guidelines:**
1. Follow the required report structure; every part it names becomes a section
2. Give each section a short, distinct name
3. Order the sections as they should appear in the final report
4. Leave every `content` field empty; the sections are written later

**Important:** Return ONLY the JSON object, no additional explanation.
"##;

/// System prompt for one section writer.
pub const SECTION_WRITER_TEMPLATE: &str = r##"
You are an expert technical writer composing one section of a report.

## Report Topic
{{ topic }}

## Section
{{ section_name }}

---

Write the body of the "{{ section_name }}" section using the research in the conversation.

**Guidelines:**
1. Stay within the scope of this section; other sections are written separately
2. Prefer concrete facts, figures and examples from the research
3. Use Markdown paragraphs and lists where they help; do not repeat the section heading
4. Aim for 150 to 400 words

**Important:** Return ONLY the section text.
"##;

/// System prompt for the final compilation pass.
pub const REPORT_COMPILER_INSTRUCTIONS: &str = "You are an expert report writer. \
Compile all the sections into a comprehensive, well-structured report. \
Ensure the report flows logically and maintains professional formatting.";

/// Renders a template with the given context.
pub fn render<S: Serialize>(template: &str, ctx: S) -> Result<String, minijinja::Error> {
    let env = Environment::new();
    let tmpl = env.template_from_str(template)?;
    Ok(tmpl.render(ctx)?.trim().to_string())
}

/// Renders the planner prompt.
pub fn report_planner_prompt(
    topic: &str,
    report_structure: &str,
) -> Result<String, minijinja::Error> {
    render(
        REPORT_PLANNER_TEMPLATE,
        context! { topic => topic, report_structure => report_structure },
    )
}

/// Renders the section writer prompt.
pub fn section_writer_prompt(section_name: &str, topic: &str) -> Result<String, minijinja::Error> {
    render(
        SECTION_WRITER_TEMPLATE,
        context! { section_name => section_name, topic => topic },
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_planner_prompt_substitutes_inputs() {
        let prompt = report_planner_prompt("WebAssembly", "1. Intro\n2. Runtimes").unwrap();
        assert!(prompt.contains("WebAssembly"));
        assert!(prompt.contains("2. Runtimes"));
        assert!(!prompt.contains("{{"));
    }

    #[test]
    fn test_section_prompt_substitutes_inputs() {
        let prompt = section_writer_prompt("Security Model", "WebAssembly").unwrap();
        assert!(prompt.contains("\"Security Model\" section"));
        assert!(prompt.contains("WebAssembly"));
    }

    #[test]
    fn test_inputs_are_not_interpreted_as_templates() {
        let prompt = section_writer_prompt("{{ evil }}", "topic").unwrap();
        assert!(prompt.contains("{{ evil }}"));
    }
}
