// src/problems.rs

use std::collections::HashMap;

use crate::{
    error::AppError,
    models::problem::{Difficulty, Language, Problem},
};

const BUNDLED_CATALOG: &str = include_str!("../data/problems.json");

/// Interview-prep problems shipped with the client.
#[derive(Debug, Clone)]
pub struct ProblemCatalog {
    problems: Vec<Problem>,
}

#[derive(Debug, Clone, Default)]
pub struct ProblemFilter {
    pub difficulty: Option<Difficulty>,
    pub topic: Option<String>,
    /// Case-insensitive match on title or topic.
    pub query: Option<String>,
}

impl ProblemCatalog {
    pub fn bundled() -> Result<Self, AppError> {
        Self::from_json(BUNDLED_CATALOG)
    }

    pub fn from_json(json: &str) -> Result<Self, AppError> {
        let problems: Vec<Problem> = serde_json::from_str(json)?;
        Ok(Self { problems })
    }

    pub fn all(&self) -> &[Problem] {
        &self.problems
    }

    pub fn get(&self, id: &str) -> Option<&Problem> {
        self.problems.iter().find(|p| p.id == id)
    }

    pub fn topics(&self) -> Vec<&str> {
        let mut topics: Vec<&str> = self.problems.iter().map(|p| p.topic.as_str()).collect();
        topics.sort_unstable();
        topics.dedup();
        topics
    }

    /// Matches sorted by difficulty, then title.
    pub fn filter(&self, filter: &ProblemFilter) -> Vec<&Problem> {
        let query = filter
            .query
            .as_deref()
            .map(str::trim)
            .filter(|q| !q.is_empty())
            .map(str::to_lowercase);

        let mut matches: Vec<&Problem> = self
            .problems
            .iter()
            .filter(|p| filter.difficulty.is_none_or(|d| p.difficulty == d))
            .filter(|p| {
                filter
                    .topic
                    .as_deref()
                    .is_none_or(|t| p.topic.eq_ignore_ascii_case(t))
            })
            .filter(|p| {
                query.as_deref().is_none_or(|q| {
                    p.title.to_lowercase().contains(q) || p.topic.to_lowercase().contains(q)
                })
            })
            .collect();

        matches.sort_by(|a, b| a.difficulty.cmp(&b.difficulty).then_with(|| a.title.cmp(&b.title)));
        matches
    }
}

/// Code editor buffer: one draft per (problem, language).
#[derive(Debug, Clone)]
pub struct Editor {
    language: Language,
    drafts: HashMap<(String, Language), String>,
}

impl Editor {
    pub fn new(language: Language) -> Self {
        Self {
            language,
            drafts: HashMap::new(),
        }
    }

    pub fn language(&self) -> Language {
        self.language
    }

    /// Text shown for `problem` in the current language: the draft, else the starter.
    pub fn text<'a>(&'a self, problem: &'a Problem) -> &'a str {
        self.drafts
            .get(&(problem.id.clone(), self.language))
            .or_else(|| problem.starter.get(&self.language))
            .map_or("", String::as_str)
    }

    /// Drafts of the previous language are kept.
    pub fn switch_language(&mut self, language: Language) {
        self.language = language;
    }

    pub fn edit(&mut self, problem: &Problem, text: &str) {
        self.drafts
            .insert((problem.id.clone(), self.language), text.to_string());
    }

    /// Discards the draft for the current language.
    pub fn reset(&mut self, problem: &Problem) {
        self.drafts.remove(&(problem.id.clone(), self.language));
    }

    pub fn is_modified(&self, problem: &Problem) -> bool {
        let starter = problem
            .starter
            .get(&self.language)
            .map_or("", String::as_str);
        self.drafts
            .get(&(problem.id.clone(), self.language))
            .is_some_and(|draft| draft != starter)
    }
}
