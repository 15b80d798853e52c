// Instruction templates. `{context}` and `{passage_count}` are filled by the assembler;
// every other placeholder must be supplied by the engine.

pub const ASK_POLICY: &str = "You are answering a student's question as a patient course tutor. Explain clearly and concisely, and keep to what the Context states.";

pub const ASK_TEMPLATE: &str = "Question: {question}\n\nContext:\n{context}\n\nAnswer:";

pub const QUIZ_POLICY: &str = "You write self-assessment questions for a student, strictly from the Context. Questions must be clear and short. If the Context is not enough for a question, leave it out rather than invent one.";

pub const QUIZ_TEMPLATE: &str = "Write {num} questions on the topic: {topic}.\nLimit yourself to the information in the Context. Format them as a numbered list. Fewer than {num} questions is acceptable when the Context does not support more.\n\nContext:\n{context}\n\nQuestions:";

pub const TASK_POLICY: &str = "You write course assignments strictly from the Context. State the assignment precisely, how it will be graded, and what the student must hand in.";

pub const TASK_TEMPLATE: &str = "Write an assignment on the topic: {topic}. Use only information from the Context.\nInclude: the goal of the assignment, the assignment statement, the grading rubric, the expected answer format.\n\nContext:\n{context}\n\nAssignment:";
