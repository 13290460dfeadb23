//! Study operations backed by an injected [`TextGenerator`].
//!
//! Every operation degrades instead of failing: generation and parse errors
//! are logged and replaced by an empty result or a configured message.

use serde::de::DeserializeOwned;
use serde_json::Value;
use tracing::{error, info_span};

use crate::config::GeneratorConfig;
use crate::generator::{GenerationRequest, TextGenerator, Turn};
use crate::records::{
    ChatMessage, Difficulty, Flashcard, GlossaryTerm, LessonSolution, QuestionType, QuizAnalysis,
    QuizQuestion, ResponseSchema, SuggestedSource, parse_json_or,
};

pub struct StudyAssistant<G> {
    generator: G,
    config: GeneratorConfig,
}

impl<G: TextGenerator> StudyAssistant<G> {
    pub fn new(generator: G, config: GeneratorConfig) -> Self {
        Self { generator, config }
    }

    /// Explain content as headed bullet points in the Markdown subset.
    pub fn summary(&self, content: &str) -> String {
        let prompt = format!(
            "Explain the following content thoroughly and clearly as key points. \
             Use Markdown with `##`/`###` headings, `* ` bullet points and **bold** \
             to organize the explanation:\n\n---\n{content}\n---"
        );
        let request = GenerationRequest::prompt(&self.config.model, prompt);
        self.prose("summary", &request, &self.config.summary_failure)
    }

    pub fn flashcards(&self, content: &str) -> Vec<Flashcard> {
        let prompt = format!(
            "Extract questions and answers suitable for review flashcards from the \
             following content. Respond with a JSON array of objects, each with \
             'question' and 'answer'. Generate 5 to 10 cards.\n\nContent:\n{content}"
        );
        self.structured("flashcards", prompt, Flashcard::list_schema(), Vec::new())
    }

    /// Generate a mixed-type quiz. True/false questions always get the two
    /// configured labels as their options.
    pub fn quiz(&self, content: &str, difficulty: Difficulty, count: usize) -> Vec<QuizQuestion> {
        let prompt = format!(
            "Based on the following content, create a quiz of {count} questions at \
             '{difficulty}' difficulty. Mix the question types 'multiple-choice', \
             'true-false' and 'short-answer'. For each question give 'question', \
             'type', 'options' (4 options for multiple-choice, ['{t}', '{f}'] for \
             true-false, empty for short-answer), 'correctAnswer', 'explanation' and \
             'sourceLesson' (the lesson title taken from headers such as \"Lesson \
             title: ...\" in the content, or an empty string). Respond with a JSON \
             array of objects.\n\nContent:\n{content}",
            difficulty = difficulty.label(),
            t = self.config.true_label,
            f = self.config.false_label,
        );
        let questions: Vec<QuizQuestion> =
            self.structured("quiz", prompt, QuizQuestion::list_schema(), Vec::new());

        questions
            .into_iter()
            .map(|mut question| {
                if question.question_type == QuestionType::TrueFalse {
                    question.options = vec![
                        self.config.true_label.clone(),
                        self.config.false_label.clone(),
                    ];
                }
                question
            })
            .collect()
    }

    pub fn glossary(&self, content: &str) -> Vec<GlossaryTerm> {
        let prompt = format!(
            "Build a glossary of the important terms in the following content, with a \
             clear definition for each. Respond with a JSON array of objects, each with \
             'term' and 'definition'.\n\nContent:\n{content}"
        );
        self.structured("glossary", prompt, GlossaryTerm::list_schema(), Vec::new())
    }

    /// Identify the 2-3 topics behind a set of wrong answers.
    pub fn analyze_incorrect_answers(
        &self,
        content: &str,
        incorrect: &[QuizQuestion],
    ) -> QuizAnalysis {
        let answers = incorrect
            .iter()
            .map(|q| {
                format!(
                    "- Question: {}\n- Correct answer: {}",
                    q.question, q.correct_answer
                )
            })
            .collect::<Vec<_>>()
            .join("\n");
        let prompt = format!(
            "Based on the original content and the incorrectly answered questions \
             below, identify the 2-3 main topics the student is weak in. Respond with \
             a JSON object with the key 'main_topics_of_weakness' holding an array of \
             strings.\n\nOriginal content:\n{content}\n\nIncorrectly answered \
             questions:\n{answers}"
        );
        self.structured(
            "analyze_incorrect_answers",
            prompt,
            QuizAnalysis::schema(),
            QuizAnalysis::default(),
        )
    }

    /// Continue a tutoring conversation.
    pub fn chat(
        &self,
        history: &[ChatMessage],
        message: &str,
        system_instruction: &str,
    ) -> String {
        let turns = history
            .iter()
            .map(|m| Turn {
                role: m.role,
                text: m.text.clone(),
            })
            .chain(std::iter::once(Turn::user(message)))
            .collect();
        let request = GenerationRequest::conversation(&self.config.model, turns)
            .with_system_instruction(system_instruction);
        self.prose("chat", &request, &self.config.chat_failure)
    }

    pub fn lesson_solutions(&self, content: &str) -> Vec<LessonSolution> {
        let prompt = format!(
            "Extract the questions or exercises in the following lesson and give a \
             detailed model solution for each. Respond with a JSON array of objects, \
             each with 'question' and 'solution'.\n\nContent:\n{content}"
        );
        self.structured(
            "lesson_solutions",
            prompt,
            LessonSolution::list_schema(),
            Vec::new(),
        )
    }

    pub fn suggested_sources(&self, content: &str) -> Vec<SuggestedSource> {
        let prompt = format!(
            "Based on the following content, suggest 3-5 external sources (articles, \
             videos, books) for a deeper understanding of the topic. Respond with a \
             JSON array of objects, each with 'title', 'url' and 'type' (one of \
             'article', 'video' or 'book').\n\nContent:\n{content}"
        );
        self.structured(
            "suggested_sources",
            prompt,
            SuggestedSource::list_schema(),
            Vec::new(),
        )
    }

    /// One multiple-choice practice question for a standardized test skill.
    pub fn standardized_test_question(
        &self,
        subject: &str,
        skill: &str,
        difficulty: Difficulty,
    ) -> Option<QuizQuestion> {
        let prompt = format!(
            "You write standardized test questions. Create exactly one multiple-choice \
             question with 4 options for the test: {subject}.\n\
             The question must target this skill: {skill}.\n\
             Difficulty: {difficulty}.\n\n\
             Respond with a single JSON object, not an array, with:\n\
             - \"question\": the question text.\n\
             - \"type\": \"multiple-choice\".\n\
             - \"options\": an array of 4 strings.\n\
             - \"correctAnswer\": the correct option, exactly as written in options.\n\
             - \"explanation\": why the answer is right and the others are wrong.\n\
             - \"sourceLesson\": {skill}.\n\n\
             Do not add any text or Markdown around the JSON object.",
            difficulty = difficulty.label(),
        );
        self.structured(
            "standardized_test_question",
            prompt,
            QuizQuestion::schema(),
            None,
        )
    }

    fn prose(&self, operation: &str, request: &GenerationRequest, fallback: &str) -> String {
        let _span = info_span!("generate", operation).entered();
        match self.generator.generate(request) {
            Ok(text) => text,
            Err(e) => {
                error!(operation, error = %e, "generation failed");
                fallback.to_string()
            }
        }
    }

    fn structured<T: DeserializeOwned>(
        &self,
        operation: &str,
        prompt: String,
        schema: Value,
        default: T,
    ) -> T {
        let _span = info_span!("generate", operation).entered();
        let request = GenerationRequest::prompt(&self.config.model, prompt).with_schema(schema);
        match self.generator.generate(&request) {
            Ok(text) => parse_json_or(&text, default),
            Err(e) => {
                error!(operation, error = %e, "generation failed");
                default
            }
        }
    }
}

/// System instruction for a tutor confined to one lesson's content.
pub fn tutor_instruction(subject: Option<&str>, content: &str) -> String {
    let role = match subject {
        Some(subject) => format!("You are an AI tutor specialized in {subject}."),
        None => "You are a specialized AI tutor.".to_string(),
    };
    format!(
        "{role} Answer the student's questions using only the study content provided. \
         Be friendly and clear. If a question is outside the content, politely say you \
         have no information about it. The content is:\n\n---\n{content}\n---"
    )
}

/// Append the question a student is practicing to a tutor instruction.
pub fn with_practice_context(instruction: &str, question: &QuizQuestion) -> String {
    format!(
        "{instruction}\n\n---\nContext of the question the student is practicing \
         (mention it only if their question is directly about it):\n\
         Question: {}\nOptions: {}\nCorrect answer: {}\nExplanation: {}\n---",
        question.question,
        question.options.join(", "),
        question.correct_answer,
        question.explanation,
    )
}
