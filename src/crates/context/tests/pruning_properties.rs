mod common;

use common::{words, MockProvider};
use context::{ContextManager, Metadata, Role};
use proptest::prelude::*;
use serde_json::json;
use std::sync::Arc;

fn role_strategy() -> impl Strategy<Value = Role> {
    prop_oneof![
        1 => Just(Role::System),
        4 => Just(Role::User),
        4 => Just(Role::Assistant),
    ]
}

proptest! {
    #[test]
    fn prop_pruning_respects_budget_and_keeps_system(
        max_tokens in 1usize..200,
        reserve_tokens in 0usize..60,
        entries in prop::collection::vec(
            (role_strategy(), 1usize..60, prop::option::of(0i64..1_000)),
            1..25,
        ),
    ) {
        let mut ctx = ContextManager::new(Arc::new(MockProvider::new()), max_tokens, reserve_tokens);
        let budget = max_tokens.saturating_sub(reserve_tokens);
        let mut system_tokens = 0;
        let mut system_count = 0;

        for (role, size, timestamp) in entries {
            let metadata = timestamp.map(|ts| {
                let mut m = Metadata::new();
                m.insert("timestamp".to_string(), json!(ts));
                m
            });
            ctx.add_message(role, words(size), metadata);

            if role == Role::System {
                system_tokens += size;
                system_count += 1;
            }

            let total = ctx.get_token_count();
            let stored: usize = ctx.messages().iter().map(|m| m.token_count).sum();
            prop_assert_eq!(total, stored);

            let kept_system = ctx.messages().iter().filter(|m| m.role == Role::System).count();
            prop_assert_eq!(kept_system, system_count);

            if system_tokens <= budget {
                prop_assert!(total <= budget, "total {} over budget {}", total, budget);
            } else {
                prop_assert_eq!(total, system_tokens);
            }
        }
    }

    #[test]
    fn prop_pruning_preserves_conversational_order(
        sizes in prop::collection::vec(1usize..30, 1..20),
    ) {
        let mut ctx = ContextManager::new(Arc::new(MockProvider::new()), 100, 10);
        for (i, size) in sizes.iter().enumerate() {
            let mut m = Metadata::new();
            m.insert("timestamp".to_string(), json!(i));
            ctx.add_message(Role::User, words(*size), Some(m));
        }

        let stamps: Vec<i64> = ctx
            .messages()
            .iter()
            .map(|m| m.metadata["timestamp"].as_i64().unwrap())
            .collect();
        prop_assert!(stamps.windows(2).all(|w| w[0] < w[1]));
    }
}
