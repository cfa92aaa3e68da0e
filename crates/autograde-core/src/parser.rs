//! Worksheet document parser.
//!
//! Loads worksheets from TOML or JSON files and directories, and validates
//! their answer keys. Keys are camelCase as authored by the web editor;
//! snake_case spellings are accepted as aliases.

use std::collections::HashSet;
use std::path::Path;

use anyhow::{Context, Result};
use serde::Deserialize;
use serde_json::Value;

use crate::error::GradingError;
use crate::model::{whole_number, Difficulty, MatchPair, Question, QuestionKind, Worksheet};

/// On-disk format of a worksheet document.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DocumentFormat {
    Toml,
    Json,
}

impl DocumentFormat {
    /// Pick the format from a file extension.
    pub fn from_path(path: &Path) -> Option<Self> {
        match path.extension()?.to_str()? {
            "toml" => Some(DocumentFormat::Toml),
            "json" => Some(DocumentFormat::Json),
            _ => None,
        }
    }
}

/// Intermediate structure shared by both document formats.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawWorksheet {
    #[serde(default)]
    id: Option<RawId>,
    #[serde(default)]
    title: String,
    #[serde(default)]
    description: String,
    #[serde(default)]
    subject: Option<String>,
    #[serde(default, alias = "grade_level")]
    grade_level: Option<String>,
    #[serde(default)]
    difficulty: Option<String>,
    #[serde(default, alias = "estimated_time")]
    estimated_time: Option<u32>,
    #[serde(default = "default_true", alias = "auto_grade")]
    auto_grade: bool,
    #[serde(default, alias = "pass_score")]
    pass_score: Option<u32>,
    #[serde(default)]
    questions: Option<Vec<RawQuestion>>,
}

fn default_true() -> bool {
    true
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum RawId {
    Text(String),
    Number(i64),
}

impl RawId {
    fn into_string(self) -> String {
        match self {
            RawId::Text(s) => s,
            RawId::Number(n) => n.to_string(),
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawQuestion {
    id: RawId,
    #[serde(rename = "type")]
    kind: String,
    #[serde(default)]
    points: Option<f64>,
    #[serde(default, alias = "question", alias = "text")]
    prompt: String,
    #[serde(default)]
    options: Vec<String>,
    #[serde(default, alias = "correct_answer")]
    correct_answer: Option<RawKey>,
    #[serde(default, alias = "correct_answers")]
    correct_answers: Option<Vec<RawIndex>>,
    #[serde(default, alias = "case_sensitive")]
    case_sensitive: bool,
    #[serde(default)]
    pairs: Option<Vec<MatchPair>>,
    #[serde(default, alias = "correct_order")]
    correct_order: Option<Vec<RawIndex>>,
    #[serde(default)]
    items: Vec<String>,
}

/// `correctAnswer` is an index for multiple-choice and text for short-answer.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum RawKey {
    Index(RawIndex),
    Text(String),
}

/// An authored index. `1.0` is accepted as `1`; `1.5` is not an index.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum RawIndex {
    Int(i64),
    Float(f64),
}

impl RawIndex {
    fn value(self) -> Option<i64> {
        match self {
            RawIndex::Int(i) => Some(i),
            RawIndex::Float(f) => whole_number(f),
        }
    }
}

fn index_list(
    raw: Option<Vec<RawIndex>>,
    id: &str,
    kind: &str,
    field: &str,
) -> Result<Vec<i64>, GradingError> {
    raw.ok_or_else(|| missing_key(id, kind, field))?
        .into_iter()
        .map(|i| {
            i.value().ok_or_else(|| {
                GradingError::InvalidInput(format!(
                    "{kind} question '{id}' has a non-integer index in {field}"
                ))
            })
        })
        .collect()
}

fn missing_key(id: &str, kind: &str, field: &str) -> GradingError {
    GradingError::InvalidInput(format!("{kind} question '{id}' has no {field}"))
}

impl RawQuestion {
    fn into_question(self) -> Result<Question, GradingError> {
        let id = self.id.into_string();
        let points = self.points.unwrap_or(0.0);
        if !points.is_finite() || points < 0.0 {
            return Err(GradingError::InvalidInput(format!(
                "question '{id}' has invalid points: {points}"
            )));
        }

        let kind = match self.kind.as_str() {
            "multiple-choice" => match self.correct_answer {
                Some(RawKey::Index(index)) => QuestionKind::MultipleChoice {
                    options: self.options,
                    correct_answer: index.value().ok_or_else(|| {
                        GradingError::InvalidInput(format!(
                            "{} question '{id}' has a non-integer correctAnswer",
                            self.kind
                        ))
                    })?,
                },
                _ => return Err(missing_key(&id, &self.kind, "correctAnswer index")),
            },
            "checkbox" => QuestionKind::Checkbox {
                options: self.options,
                correct_answers: index_list(
                    self.correct_answers,
                    &id,
                    &self.kind,
                    "correctAnswers",
                )?,
            },
            "short-answer" => match self.correct_answer {
                Some(RawKey::Text(correct_answer)) => QuestionKind::ShortAnswer {
                    correct_answer,
                    case_sensitive: self.case_sensitive,
                },
                _ => return Err(missing_key(&id, &self.kind, "correctAnswer text")),
            },
            "matching" => QuestionKind::Matching {
                pairs: self
                    .pairs
                    .ok_or_else(|| missing_key(&id, &self.kind, "pairs"))?,
            },
            "ordering" => QuestionKind::Ordering {
                items: self.items,
                correct_order: index_list(self.correct_order, &id, &self.kind, "correctOrder")?,
            },
            other => QuestionKind::Unsupported {
                type_name: other.to_string(),
            },
        };

        Ok(Question {
            id,
            prompt: self.prompt,
            points,
            kind,
        })
    }
}

impl RawWorksheet {
    fn into_worksheet(self) -> Result<Worksheet, GradingError> {
        let questions = self
            .questions
            .ok_or_else(|| GradingError::InvalidInput("worksheet has no question list".into()))?
            .into_iter()
            .map(RawQuestion::into_question)
            .collect::<Result<Vec<_>, _>>()?;

        let difficulty = match self.difficulty {
            Some(d) => d.parse().map_err(GradingError::InvalidInput)?,
            None => Difficulty::default(),
        };

        Ok(Worksheet {
            id: self.id.map(RawId::into_string).unwrap_or_default(),
            title: self.title,
            description: self.description,
            subject: self.subject,
            grade_level: self.grade_level,
            difficulty,
            estimated_time: self.estimated_time,
            auto_grade: self.auto_grade,
            pass_score: self.pass_score,
            questions,
        })
    }
}

/// Build a worksheet from an already decoded JSON value.
pub fn worksheet_from_value(value: Value) -> Result<Worksheet, GradingError> {
    if !value.is_object() {
        return Err(GradingError::InvalidInput(
            "worksheet must be an object".into(),
        ));
    }
    let raw: RawWorksheet = serde_json::from_value(value)
        .map_err(|e| GradingError::InvalidInput(format!("malformed worksheet: {e}")))?;
    raw.into_worksheet()
}

/// Parse a single worksheet file. The format follows the file extension.
pub fn parse_worksheet(path: &Path) -> Result<Worksheet> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read worksheet file: {}", path.display()))?;
    let format = DocumentFormat::from_path(path).unwrap_or(DocumentFormat::Toml);

    parse_worksheet_str(&content, format, path)
}

/// Parse a worksheet document from a string (useful for testing).
pub fn parse_worksheet_str(
    content: &str,
    format: DocumentFormat,
    source_path: &Path,
) -> Result<Worksheet> {
    let raw: RawWorksheet = match format {
        DocumentFormat::Toml => toml::from_str(content)
            .with_context(|| format!("failed to parse TOML: {}", source_path.display()))?,
        DocumentFormat::Json => serde_json::from_str(content)
            .with_context(|| format!("failed to parse JSON: {}", source_path.display()))?,
    };

    raw.into_worksheet()
        .with_context(|| format!("invalid worksheet: {}", source_path.display()))
}

/// Recursively load all `.toml` and `.json` worksheets from a directory.
pub fn load_worksheet_directory(dir: &Path) -> Result<Vec<Worksheet>> {
    let mut worksheets = Vec::new();

    if !dir.is_dir() {
        anyhow::bail!("not a directory: {}", dir.display());
    }

    let mut entries = std::fs::read_dir(dir)
        .with_context(|| format!("failed to read directory: {}", dir.display()))?
        .collect::<std::io::Result<Vec<_>>>()?;
    entries.sort_by_key(|e| e.path());

    for entry in entries {
        let path = entry.path();

        if path.is_dir() {
            worksheets.extend(load_worksheet_directory(&path)?);
        } else if DocumentFormat::from_path(&path).is_some() {
            match parse_worksheet(&path) {
                Ok(ws) => worksheets.push(ws),
                Err(e) => {
                    tracing::warn!("skipping {}: {:#}", path.display(), e);
                }
            }
        }
    }

    Ok(worksheets)
}

/// A warning from worksheet validation.
#[derive(Debug, Clone)]
pub struct ValidationWarning {
    /// The question ID (if applicable).
    pub question_id: Option<String>,
    /// Warning message.
    pub message: String,
}

impl ValidationWarning {
    fn question(id: &str, message: impl Into<String>) -> Self {
        Self {
            question_id: Some(id.to_string()),
            message: message.into(),
        }
    }
}

/// Validate a worksheet's answer keys for common authoring mistakes.
pub fn validate_worksheet(ws: &Worksheet) -> Vec<ValidationWarning> {
    let mut warnings = Vec::new();

    if ws.title.trim().is_empty() {
        warnings.push(ValidationWarning {
            question_id: None,
            message: "worksheet has no title".into(),
        });
    }

    if let Some(pass) = ws.pass_score {
        if pass > 100 {
            warnings.push(ValidationWarning {
                question_id: None,
                message: format!("pass score {pass} is above 100 and can never be reached"),
            });
        }
    }

    if ws.questions.is_empty() {
        warnings.push(ValidationWarning {
            question_id: None,
            message: "worksheet has no questions".into(),
        });
    } else if ws.max_score() == 0.0 {
        warnings.push(ValidationWarning {
            question_id: None,
            message: "no question awards points; every submission scores 0%".into(),
        });
    }

    let mut seen_ids = HashSet::new();
    for q in &ws.questions {
        if !seen_ids.insert(q.id.as_str()) {
            warnings.push(ValidationWarning::question(
                &q.id,
                format!("duplicate question ID: {}", q.id),
            ));
        }
    }

    for q in &ws.questions {
        match &q.kind {
            QuestionKind::MultipleChoice {
                options,
                correct_answer,
            } => {
                let in_range = usize::try_from(*correct_answer)
                    .map(|i| i < options.len())
                    .unwrap_or(false);
                if !options.is_empty() && !in_range {
                    warnings.push(ValidationWarning::question(
                        &q.id,
                        format!(
                            "correctAnswer {correct_answer} is not one of the {} options",
                            options.len()
                        ),
                    ));
                }
            }
            QuestionKind::Checkbox {
                options,
                correct_answers,
            } => {
                if correct_answers.is_empty() {
                    warnings.push(ValidationWarning::question(
                        &q.id,
                        "correctAnswers is empty; only an empty selection is correct",
                    ));
                }
                let mut unique = HashSet::new();
                if correct_answers.iter().any(|i| !unique.insert(*i)) {
                    warnings.push(ValidationWarning::question(
                        &q.id,
                        "correctAnswers repeats an index; no selection can match it",
                    ));
                }
                if !options.is_empty()
                    && correct_answers
                        .iter()
                        .any(|i| usize::try_from(*i).map_or(true, |i| i >= options.len()))
                {
                    warnings.push(ValidationWarning::question(
                        &q.id,
                        "correctAnswers refers to an option that does not exist",
                    ));
                }
            }
            QuestionKind::ShortAnswer { correct_answer, .. } => {
                if correct_answer.trim().is_empty() {
                    warnings.push(ValidationWarning::question(&q.id, "correctAnswer is empty"));
                }
            }
            QuestionKind::Matching { pairs } => {
                if pairs.is_empty() {
                    warnings.push(ValidationWarning::question(
                        &q.id,
                        "matching question has no pairs and always scores 0",
                    ));
                }
                let mut lefts = HashSet::new();
                for pair in pairs {
                    if !lefts.insert(pair.left.as_str()) {
                        warnings.push(ValidationWarning::question(
                            &q.id,
                            format!("left item '{}' appears in more than one pair", pair.left),
                        ));
                    }
                }
            }
            QuestionKind::Ordering { correct_order, .. } => {
                let mut unique = HashSet::new();
                if correct_order.iter().any(|i| !unique.insert(*i)) {
                    warnings.push(ValidationWarning::question(
                        &q.id,
                        "correctOrder repeats an item",
                    ));
                }
                if correct_order.len() < 2 {
                    warnings.push(ValidationWarning::question(
                        &q.id,
                        "correctOrder has fewer than 2 items",
                    ));
                }
            }
            QuestionKind::Unsupported { type_name } => {
                warnings.push(ValidationWarning::question(
                    &q.id,
                    format!("question type '{type_name}' is not auto-graded"),
                ));
            }
        }
    }

    warnings
}
