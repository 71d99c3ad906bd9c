//! 卡片编辑意图 → 内容补丁
//!
//! 纯函数：读取当前内容，计算出要提交给 `DocumentStore::update` 的补丁。
//! 题目列表和答案映射都是整体替换，所以这里总是基于完整副本修改。

use thiserror::Error;

use crate::models::document::{ContentPatch, Criterion, DocumentContent, Question};
use crate::models::event::Intent;

#[derive(Debug, Clone, PartialEq, Error)]
pub enum CardEditError {
    #[error("题目 {0} 不存在")]
    UnknownQuestion(String),
    #[error("题目 {question_id} 没有第 {index} 条评分标准")]
    CriterionOutOfRange { question_id: String, index: usize },
    #[error("分值无效: {0}")]
    InvalidPoints(f64),
}

/// 计算卡片编辑意图对应的补丁；不是卡片编辑意图时返回 `Ok(None)`
pub fn card_edit_patch(
    content: &DocumentContent,
    intent: &Intent,
) -> Result<Option<ContentPatch>, CardEditError> {
    let patch = match intent {
        Intent::SetExamName { value } => ContentPatch::exam_name(value.clone()),
        Intent::SetGeneralInstructions { value } => ContentPatch::general_instructions(value.clone()),
        Intent::SetStudentName { value } => ContentPatch::student_name(value.clone()),

        Intent::AddQuestion { text, max_points } => {
            check_points(*max_points)?;
            let mut questions = content.questions.clone();
            questions.push(Question::new(content.next_question_id(), text.clone(), *max_points));
            ContentPatch::questions(questions)
        }
        Intent::RemoveQuestion { question_id } => {
            let mut questions = content.questions.clone();
            let before = questions.len();
            questions.retain(|q| &q.id != question_id);
            if questions.len() == before {
                return Err(CardEditError::UnknownQuestion(question_id.clone()));
            }
            let mut answers = content.answers.clone();
            answers.remove(question_id);
            ContentPatch {
                questions: Some(questions),
                answers: Some(answers),
                ..Default::default()
            }
        }
        Intent::EditQuestionText { question_id, text } => {
            edit_question(content, question_id, |q| {
                q.text = text.clone();
                Ok(())
            })?
        }
        Intent::SetQuestionMaxPoints {
            question_id,
            max_points,
        } => {
            check_points(*max_points)?;
            edit_question(content, question_id, |q| {
                q.max_points = *max_points;
                Ok(())
            })?
        }
        Intent::AddCriterion {
            question_id,
            criterion,
            max_points,
        } => {
            check_points(*max_points)?;
            edit_question(content, question_id, |q| {
                q.criteria.push(Criterion::new(criterion.clone(), *max_points));
                Ok(())
            })?
        }
        Intent::RemoveCriterion { question_id, index } => {
            edit_criterion(content, question_id, *index, |criteria, i| {
                criteria.remove(i);
            })?
        }
        Intent::EditCriterion {
            question_id,
            index,
            criterion,
        } => edit_criterion(content, question_id, *index, |criteria, i| {
            criteria[i].criterion = criterion.clone();
        })?,
        Intent::SetCriterionPoints {
            question_id,
            index,
            max_points,
        } => {
            check_points(*max_points)?;
            edit_criterion(content, question_id, *index, |criteria, i| {
                criteria[i].max_points = *max_points;
            })?
        }

        // 学生答卷的答案不要求对应题目存在
        Intent::SetAnswer { question_id, answer } => {
            let mut answers = content.answers.clone();
            answers.insert(question_id.clone(), answer.clone());
            ContentPatch::answers(answers)
        }

        _ => return Ok(None),
    };
    Ok(Some(patch))
}

fn check_points(points: f64) -> Result<(), CardEditError> {
    if points.is_finite() && points >= 0.0 {
        Ok(())
    } else {
        Err(CardEditError::InvalidPoints(points))
    }
}

fn edit_question<F>(content: &DocumentContent, question_id: &str, edit: F) -> Result<ContentPatch, CardEditError>
where
    F: FnOnce(&mut Question) -> Result<(), CardEditError>,
{
    let mut questions = content.questions.clone();
    let question = questions
        .iter_mut()
        .find(|q| q.id == question_id)
        .ok_or_else(|| CardEditError::UnknownQuestion(question_id.to_string()))?;
    edit(question)?;
    Ok(ContentPatch::questions(questions))
}

fn edit_criterion<F>(
    content: &DocumentContent,
    question_id: &str,
    index: usize,
    edit: F,
) -> Result<ContentPatch, CardEditError>
where
    F: FnOnce(&mut Vec<Criterion>, usize),
{
    edit_question(content, question_id, |q| {
        if index >= q.criteria.len() {
            return Err(CardEditError::CriterionOutOfRange {
                question_id: question_id.to_string(),
                index,
            });
        }
        edit(&mut q.criteria, index);
        Ok(())
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rubric() -> DocumentContent {
        DocumentContent {
            exam_name: "期中考试".into(),
            questions: vec![
                Question::new("Q1", "1+1=?", 2.0).with_criterion("答案正确", 2.0),
                Question::new("Q2", "简述牛顿第一定律", 8.0),
            ],
            answers: [("Q1".to_string(), "2".to_string())].into_iter().collect(),
            ..Default::default()
        }
    }

    fn apply(content: &DocumentContent, intent: Intent) -> DocumentContent {
        let patch = card_edit_patch(content, &intent).unwrap().unwrap();
        let mut next = content.clone();
        patch.apply_to(&mut next);
        next
    }

    #[test]
    fn test_non_edit_intents_produce_no_patch() {
        assert_eq!(card_edit_patch(&rubric(), &Intent::Undo), Ok(None));
        assert_eq!(card_edit_patch(&rubric(), &Intent::NavigateNext), Ok(None));
    }

    #[test]
    fn test_add_question_picks_free_id() {
        let next = apply(
            &rubric(),
            Intent::AddQuestion {
                text: "新题".into(),
                max_points: 5.0,
            },
        );
        assert_eq!(next.questions.len(), 3);
        assert_eq!(next.questions[2].id, "Q3");
        assert_eq!(next.total_points(), 15.0);
    }

    #[test]
    fn test_remove_question_drops_its_answer() {
        let next = apply(
            &rubric(),
            Intent::RemoveQuestion {
                question_id: "Q1".into(),
            },
        );
        assert!(next.question("Q1").is_none());
        assert!(!next.answers.contains_key("Q1"));
    }

    #[test]
    fn test_criterion_edits() {
        let content = rubric();
        let next = apply(
            &content,
            Intent::EditCriterion {
                question_id: "Q1".into(),
                index: 0,
                criterion: "结果为 2".into(),
            },
        );
        assert_eq!(next.questions[0].criteria[0].criterion, "结果为 2");

        let next = apply(
            &next,
            Intent::SetCriterionPoints {
                question_id: "Q1".into(),
                index: 0,
                max_points: 1.5,
            },
        );
        assert_eq!(next.questions[0].criteria[0].max_points, 1.5);

        let next = apply(
            &next,
            Intent::RemoveCriterion {
                question_id: "Q1".into(),
                index: 0,
            },
        );
        assert!(next.questions[0].criteria.is_empty());
    }

    #[test]
    fn test_invalid_edits_are_rejected() {
        let content = rubric();
        assert_eq!(
            card_edit_patch(
                &content,
                &Intent::EditQuestionText {
                    question_id: "Q9".into(),
                    text: "x".into()
                }
            ),
            Err(CardEditError::UnknownQuestion("Q9".into()))
        );
        assert_eq!(
            card_edit_patch(
                &content,
                &Intent::RemoveCriterion {
                    question_id: "Q2".into(),
                    index: 0
                }
            ),
            Err(CardEditError::CriterionOutOfRange {
                question_id: "Q2".into(),
                index: 0
            })
        );
        assert!(matches!(
            card_edit_patch(
                &content,
                &Intent::SetQuestionMaxPoints {
                    question_id: "Q1".into(),
                    max_points: -1.0
                }
            ),
            Err(CardEditError::InvalidPoints(_))
        ));
    }

    #[test]
    fn test_set_answer_without_matching_question() {
        let content = DocumentContent::default();
        let next = apply(
            &content,
            Intent::SetAnswer {
                question_id: "Q7".into(),
                answer: "b".into(),
            },
        );
        assert_eq!(next.answers["Q7"], "b");
    }
}
