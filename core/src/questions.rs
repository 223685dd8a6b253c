//! The canonical five-question questionnaire.
//!
//! Point values are part of the scoring contract: the maximum reachable
//! score is 105 and every tier boundary in `ScoringConfig` assumes these
//! weights.

pub struct Question {
    pub id: &'static str,
    pub prompt: &'static str,
    pub options: &'static [QuestionOption],
}

pub struct QuestionOption {
    pub text: &'static str,
    pub points: i64,
}

pub const QUESTIONS: &[Question] = &[
    Question {
        id: "idade",
        prompt: "Qual a sua idade?",
        options: &[
            QuestionOption { text: "Menos de 35 anos", points: 5 },
            QuestionOption { text: "Entre 35 e 45 anos", points: 10 },
            QuestionOption { text: "Entre 46 e 55 anos", points: 15 },
            QuestionOption { text: "Mais de 55 anos", points: 10 },
        ],
    },
    Question {
        id: "sintomas",
        prompt: "Quais sintomas da menopausa mais te incomodam?",
        options: &[
            QuestionOption { text: "Ondas de calor (fogachos)", points: 15 },
            QuestionOption { text: "Insônia e alterações no sono", points: 10 },
            QuestionOption { text: "Ganho de peso e mudanças no corpo", points: 15 },
            QuestionOption { text: "Alterações de humor e ansiedade", points: 10 },
            QuestionOption { text: "Ainda não sinto sintomas significativos", points: 5 },
        ],
    },
    Question {
        id: "duracao",
        prompt: "Há quanto tempo você sente esses sintomas?",
        options: &[
            QuestionOption { text: "Menos de 6 meses", points: 10 },
            QuestionOption { text: "Entre 6 meses e 2 anos", points: 15 },
            QuestionOption { text: "Mais de 2 anos", points: 20 },
            QuestionOption { text: "Não sinto sintomas ainda", points: 5 },
        ],
    },
    Question {
        id: "tratamento",
        prompt: "Você já tentou algum tratamento?",
        options: &[
            QuestionOption { text: "Sim, reposição hormonal", points: 15 },
            QuestionOption { text: "Sim, métodos naturais", points: 20 },
            QuestionOption { text: "Sim, ambos os métodos", points: 25 },
            QuestionOption { text: "Não, ainda não tentei nada", points: 10 },
        ],
    },
    Question {
        id: "impacto",
        prompt: "Quanto os sintomas impactam sua vida?",
        options: &[
            QuestionOption { text: "Muito, afetam minha rotina diariamente", points: 25 },
            QuestionOption { text: "Moderadamente, incomodam mas consigo lidar", points: 15 },
            QuestionOption { text: "Pouco, são sintomas leves", points: 10 },
            QuestionOption { text: "Não afetam minha vida", points: 5 },
        ],
    },
];
