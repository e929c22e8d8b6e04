//! Centralized reflection prompt library
//!
//! Built-in writing prompts seeded into every new store. Keeping them in one
//! place makes them easy to review, test and version.

use crate::model::{Category, Prompt, PromptDifficulty};

struct BuiltinPrompt {
    id: &'static str,
    text: &'static str,
    category: Category,
    difficulty: PromptDifficulty,
    tags: &'static [&'static str],
}

const BUILTIN_PROMPTS: &[BuiltinPrompt] = &[
    BuiltinPrompt {
        id: "builtin-gratitude-1",
        text: "What are three small things that went well today?",
        category: Category::Gratitude,
        difficulty: PromptDifficulty::Beginner,
        tags: &["gratitude", "daily"],
    },
    BuiltinPrompt {
        id: "builtin-gratitude-2",
        text: "Who made a difference in your week, and how could you let them know?",
        category: Category::Gratitude,
        difficulty: PromptDifficulty::Intermediate,
        tags: &["gratitude", "relationships"],
    },
    BuiltinPrompt {
        id: "builtin-growth-1",
        text: "What is something you handled better this month than you would have a year ago?",
        category: Category::Growth,
        difficulty: PromptDifficulty::Intermediate,
        tags: &["growth", "progress"],
    },
    BuiltinPrompt {
        id: "builtin-challenges-1",
        text: "Describe a challenge you are facing. What part of it is within your control?",
        category: Category::Challenges,
        difficulty: PromptDifficulty::Intermediate,
        tags: &["challenges", "control"],
    },
    BuiltinPrompt {
        id: "builtin-relationships-1",
        text: "Which relationship felt easiest today, and which felt hardest? Why?",
        category: Category::Relationships,
        difficulty: PromptDifficulty::Intermediate,
        tags: &["relationships"],
    },
    BuiltinPrompt {
        id: "builtin-goals-1",
        text: "What is one small step you can take tomorrow toward something that matters to you?",
        category: Category::Goals,
        difficulty: PromptDifficulty::Beginner,
        tags: &["goals", "planning"],
    },
    BuiltinPrompt {
        id: "builtin-mindfulness-1",
        text: "Pause and notice your body. Where do you feel tension, and where do you feel ease?",
        category: Category::Mindfulness,
        difficulty: PromptDifficulty::Beginner,
        tags: &["mindfulness", "body"],
    },
    BuiltinPrompt {
        id: "builtin-therapy-1",
        text: "What came up in your last session that you want to keep thinking about?",
        category: Category::Therapy,
        difficulty: PromptDifficulty::Advanced,
        tags: &["therapy", "session"],
    },
    BuiltinPrompt {
        id: "builtin-coping-1",
        text: "When things felt heavy recently, what helped even a little?",
        category: Category::Coping,
        difficulty: PromptDifficulty::Beginner,
        tags: &["coping", "strategies"],
    },
    BuiltinPrompt {
        id: "builtin-progress-1",
        text: "Look back at an older entry. What has changed since you wrote it?",
        category: Category::Progress,
        difficulty: PromptDifficulty::Advanced,
        tags: &["progress", "review"],
    },
    BuiltinPrompt {
        id: "builtin-crisis-1",
        text: "Who can you reach out to right now, and what would you want them to know?",
        category: Category::Crisis,
        difficulty: PromptDifficulty::Beginner,
        tags: &["crisis", "support"],
    },
    BuiltinPrompt {
        id: "builtin-general-1",
        text: "What is on your mind right now?",
        category: Category::General,
        difficulty: PromptDifficulty::Beginner,
        tags: &["open"],
    },
];

/// The built-in prompt library, in a stable order.
pub fn builtin_prompts() -> Vec<Prompt> {
    BUILTIN_PROMPTS
        .iter()
        .map(|p| Prompt {
            id: p.id.to_string(),
            text: p.text.to_string(),
            category: p.category,
            difficulty: p.difficulty,
            tags: p.tags.iter().map(|t| t.to_string()).collect(),
            is_custom: false,
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn test_builtin_ids_unique() {
        let prompts = builtin_prompts();
        let ids: HashSet<_> = prompts.iter().map(|p| p.id.as_str()).collect();
        assert_eq!(ids.len(), prompts.len());
    }

    #[test]
    fn test_every_category_has_a_prompt() {
        let prompts = builtin_prompts();
        for category in Category::ALL {
            assert!(
                prompts.iter().any(|p| p.category == category),
                "no built-in prompt for {}",
                category
            );
        }
    }

    #[test]
    fn test_builtins_are_not_custom() {
        assert!(builtin_prompts().iter().all(|p| !p.is_custom && !p.text.is_empty()));
    }
}
