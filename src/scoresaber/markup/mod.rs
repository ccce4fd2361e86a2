//! Declarative description of where each leaderboard field lives in the rendered markup.
//!
//! The page's class names carry build-specific hashes, so a [`RowSchema`] is instantiated per
//! page from the hashes found by [`crate::scoresaber::parser::structure_hash`]. Every field is
//! looked up through a [`FieldRule`]; a lookup that fails reports the field and the exact
//! step that found nothing.

use std::fmt::{self, Display};

use scraper::{element_ref::Select, ElementRef, Selector};
use thiserror::Error;

pub mod latest;

/// Generation of the site's markup a [`RowSchema`] was written for.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum MarkupVersion {
    Latest,
}

/// Class-name fragments that identify the structural elements of a page.
/// All matching is by substring against the full `class` attribute.
#[derive(Clone, Copy, Debug)]
pub struct StructurePatterns {
    /// Only `div`s below this selector are scanned.
    pub scan_root: &'static str,
    pub root: &'static str,
    pub ranking: &'static str,
    pub song: &'static str,
    pub score: &'static str,
}

impl MarkupVersion {
    pub fn patterns(self) -> StructurePatterns {
        match self {
            MarkupVersion::Latest => latest::PATTERNS,
        }
    }
}

#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum Field {
    Rank,
    Difficulty,
    Star,
    SongName,
    Artist,
    Mapper,
    ScoreBlock,
    Accuracy,
    PpBlock,
    PpGiven,
    PpWeighted,
    Weight,
    Modifier,
}

impl Field {
    pub const ALL: [Field; 13] = [
        Field::Rank,
        Field::Difficulty,
        Field::Star,
        Field::SongName,
        Field::Artist,
        Field::Mapper,
        Field::ScoreBlock,
        Field::Accuracy,
        Field::PpBlock,
        Field::PpGiven,
        Field::PpWeighted,
        Field::Weight,
        Field::Modifier,
    ];
}

#[derive(Debug, Error)]
pub enum ExtractError {
    #[error("No class attribute containing {pattern:?} was found")]
    StructureNotFound { pattern: &'static str },
    #[error("{field:?} not found ({version:?} markup): {step}")]
    FieldNotFound {
        version: MarkupVersion,
        field: Field,
        step: String,
    },
    #[error("{field:?} has unexpected text {text:?}: {reason}")]
    Malformed {
        field: Field,
        text: String,
        reason: String,
    },
    #[error("Invalid selector {css:?}: {reason}")]
    InvalidSelector { css: String, reason: String },
}

impl ExtractError {
    pub(crate) fn malformed(field: Field, text: &str, reason: impl Display) -> Self {
        Self::Malformed {
            field,
            text: text.to_owned(),
            reason: reason.to_string(),
        }
    }
}

/// "The `nth` element matching `css`", searched among the descendants of the current element.
#[derive(Clone, Debug)]
pub struct Step {
    css: String,
    selector: Selector,
    nth: usize,
}

impl Step {
    pub fn first(css: impl Into<String>) -> Result<Self, ExtractError> {
        Self::nth(css, 0)
    }

    pub fn nth(css: impl Into<String>, nth: usize) -> Result<Self, ExtractError> {
        let css = css.into();
        let selector = Selector::parse(&css).map_err(|e| ExtractError::InvalidSelector {
            css: css.clone(),
            reason: e.to_string(),
        })?;
        Ok(Self { css, selector, nth })
    }

    pub fn find<'a>(&self, scope: ElementRef<'a>) -> Option<ElementRef<'a>> {
        scope.select(&self.selector).nth(self.nth)
    }

    pub fn find_all<'a, 'b>(&'b self, scope: ElementRef<'a>) -> Select<'a, 'b> {
        scope.select(&self.selector)
    }
}

impl Display for Step {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}[{}]", self.css, self.nth)
    }
}

#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum Read {
    Text,
    Attr(&'static str),
    /// The rule only locates a block; the element itself is the value.
    Element,
}

#[derive(Debug)]
pub struct FieldRule {
    pub field: Field,
    /// Index into the row's context list.
    pub context: usize,
    pub steps: Vec<Step>,
    pub read: Read,
}

/// Where the rows are and where each of their fields is, for one page.
#[derive(Debug)]
pub struct RowSchema {
    pub version: MarkupVersion,
    /// Exact `class` attribute of the element holding all rows.
    pub root_class: String,
    pub row: Step,
    /// Elements of a row that [`FieldRule::context`] indexes into.
    pub context: Step,
    pub rules: Vec<FieldRule>,
}

impl RowSchema {
    pub fn rule(&self, field: Field) -> Result<&FieldRule, ExtractError> {
        self.rules
            .iter()
            .find(|rule| rule.field == field)
            .ok_or_else(|| ExtractError::FieldNotFound {
                version: self.version,
                field,
                step: "no rule declared".to_owned(),
            })
    }

    pub fn view<'a>(&'a self, row: ElementRef<'a>) -> RowView<'a> {
        RowView {
            schema: self,
            contexts: self.context.find_all(row).collect(),
        }
    }
}

/// A row together with its context elements, ready for field lookups.
pub struct RowView<'a> {
    schema: &'a RowSchema,
    contexts: Vec<ElementRef<'a>>,
}

impl<'a> RowView<'a> {
    /// Follows the rule's steps.
    /// A missing context element is a schema violation and always an error;
    /// a step that finds nothing yields `Ok(None)`.
    pub fn element(&self, field: Field) -> Result<Option<ElementRef<'a>>, ExtractError> {
        self.walk(field).map(|found| found.ok())
    }

    pub fn require_element(&self, field: Field) -> Result<ElementRef<'a>, ExtractError> {
        self.walk(field)?.map_err(|step| self.not_found(field, step))
    }

    pub fn value(&self, field: Field) -> Result<Option<String>, ExtractError> {
        match self.walk(field)? {
            Ok(element) => self.read(field, element).map(Some),
            Err(_) => Ok(None),
        }
    }

    pub fn require_value(&self, field: Field) -> Result<String, ExtractError> {
        let element = self.require_element(field)?;
        self.read(field, element)
    }

    fn walk(&self, field: Field) -> Result<Result<ElementRef<'a>, String>, ExtractError> {
        let rule = self.schema.rule(field)?;
        let mut current = *self.contexts.get(rule.context).ok_or_else(|| {
            self.not_found(
                field,
                format!(
                    "context #{} of {} ({})",
                    rule.context,
                    self.contexts.len(),
                    self.schema.context
                ),
            )
        })?;
        for step in &rule.steps {
            match step.find(current) {
                Some(next) => current = next,
                None => return Ok(Err(step.to_string())),
            }
        }
        Ok(Ok(current))
    }

    fn read(&self, field: Field, element: ElementRef<'a>) -> Result<String, ExtractError> {
        let rule = self.schema.rule(field)?;
        match rule.read {
            Read::Text => Ok(element.text().collect::<String>().trim().to_owned()),
            Read::Attr(name) => element
                .attr(name)
                .map(str::to_owned)
                .ok_or_else(|| self.not_found(field, format!("attribute {name:?}"))),
            Read::Element => Ok(element.html()),
        }
    }

    fn not_found(&self, field: Field, step: String) -> ExtractError {
        ExtractError::FieldNotFound {
            version: self.schema.version,
            field,
            step,
        }
    }
}
