//! Skeleton documents used when a document is synthesized from intent alone.

use quill_core::intent::TemplateKind;

pub const OUTLINE: &str = "# Story Outline

## Logline

## Act One
- Setup:
- Inciting incident:

## Act Two
- Rising action:
- Midpoint:
- All is lost:

## Act Three
- Climax:
- Resolution:
";

pub const TREATMENT: &str = "# Treatment

## Title

## Logline

## Synopsis

## Main Characters

## Tone and Style
";

pub const SCRIPT: &str = "Title: Untitled

FADE IN:

INT. LOCATION - DAY

Describe the scene.

CHARACTER
(beat)
First line of dialogue.

FADE OUT.
";

pub const CHARACTER: &str = "# Character Profile

## Name

## Want

## Need

## Flaw

## Arc
";

pub const GENERIC: &str = "# New Document

## Notes
";

pub fn skeleton(kind: TemplateKind) -> &'static str {
    match kind {
        TemplateKind::Outline => OUTLINE,
        TemplateKind::Treatment => TREATMENT,
        TemplateKind::Script => SCRIPT,
        TemplateKind::Character => CHARACTER,
        TemplateKind::Generic => GENERIC,
    }
}

pub fn label(kind: TemplateKind) -> &'static str {
    match kind {
        TemplateKind::Outline => "outline",
        TemplateKind::Treatment => "treatment",
        TemplateKind::Script => "script",
        TemplateKind::Character => "character profile",
        TemplateKind::Generic => "document",
    }
}
