use crate::models::{Analysis, Counter};

use super::selection::CurrentItem;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Section {
    Content,
    Analysis,
    Counters,
}

impl Section {
    pub const ALL: [Section; 3] = [Section::Content, Section::Analysis, Section::Counters];

    fn index(self) -> usize {
        match self {
            Section::Content => 0,
            Section::Analysis => 1,
            Section::Counters => 2,
        }
    }

    pub fn title(self) -> &'static str {
        match self {
            Section::Content => "Article Content",
            Section::Analysis => "Article Analysis",
            Section::Counters => "Article Counter Analysis",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BaseSection<'a> {
    Present(&'a Analysis),
    NotFound,
    Failed(&'a str),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CounterSection<'a> {
    Present(&'a [Counter]),
    NotFound,
    Failed(&'a str),
}

pub fn base_section(current: &CurrentItem) -> BaseSection<'_> {
    let Some(record) = &current.analysis else {
        return BaseSection::NotFound;
    };
    if let Some(error) = record.report.error() {
        return BaseSection::Failed(error);
    }
    record
        .report
        .analysis()
        .map_or(BaseSection::NotFound, BaseSection::Present)
}

pub fn counter_section(current: &CurrentItem) -> CounterSection<'_> {
    let Some(record) = &current.analysis else {
        return CounterSection::NotFound;
    };
    if let Some(error) = record.report.error() {
        return CounterSection::Failed(error);
    }
    record
        .report
        .counters()
        .map_or(CounterSection::NotFound, CounterSection::Present)
}

/// Request to generate the missing content of one section.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GenerateIntent {
    pub item_uuid: i64,
    pub section: Section,
}

/// Emits an intent only when `section` currently shows its placeholder.
pub fn generate_intent(current: &CurrentItem, section: Section) -> Option<GenerateIntent> {
    let missing = match section {
        Section::Content => false,
        Section::Analysis => !matches!(base_section(current), BaseSection::Present(_)),
        Section::Counters => !matches!(counter_section(current), CounterSection::Present(_)),
    };
    missing.then_some(GenerateIntent {
        item_uuid: current.article.uuid,
        section,
    })
}

/// Accordion and pending-work state of the detail view.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DetailState {
    expanded: [bool; 3],
    generating: Option<Section>,
}

impl DetailState {
    pub fn is_expanded(&self, section: Section) -> bool {
        self.expanded[section.index()]
    }

    /// Sections expand independently; several may be open at once.
    pub fn toggle(&mut self, section: Section) {
        let slot = &mut self.expanded[section.index()];
        *slot = !*slot;
    }

    pub fn expand(&mut self, section: Section) {
        self.expanded[section.index()] = true;
    }

    /// Fresh state for a newly selected item.
    pub fn reset(&mut self) {
        *self = Self::default();
    }

    pub fn generating(&self) -> Option<Section> {
        self.generating
    }

    pub fn set_generating(&mut self, section: Option<Section>) {
        self.generating = section;
    }
}
