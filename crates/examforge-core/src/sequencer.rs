//! Flattening of exam sections into one navigable sequence.

use serde::Serialize;

use crate::model::{Exam, Question, SectionKind};

/// A question annotated with the section it came from.
///
/// `(kind, question.question_number)` is the question's global identity.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FlattenedQuestion {
    pub kind: SectionKind,
    pub section_title: String,
    #[serde(flatten)]
    pub question: Question,
}

impl FlattenedQuestion {
    pub fn number(&self) -> u32 {
        self.question.question_number
    }
}

/// Flatten an exam into mcq, fill_blank, true_false, short_answer order.
///
/// Matching is left out: it has no per-question navigation. Absent sections
/// contribute nothing; order within a section is preserved.
pub fn flatten(exam: &Exam) -> Vec<FlattenedQuestion> {
    let mut sequence = Vec::with_capacity(exam.question_count());
    for kind in SectionKind::NAVIGABLE {
        let Some(section) = exam.sections.get(kind) else {
            continue;
        };
        sequence.extend(section.questions.iter().map(|q| FlattenedQuestion {
            kind,
            section_title: section.section_title.clone(),
            question: q.clone(),
        }));
    }
    tracing::debug!(
        exam = %exam.exam_title,
        questions = sequence.len(),
        "flattened exam"
    );
    sequence
}
