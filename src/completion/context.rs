//! Completion context classification.
//!
//! Decides from the trail (the values under the cursor, outermost first)
//! what the author is about to type: play, task, block or role keys, a
//! module name, or the arguments of a module.
//!
//! The rules run in a fixed order and later rules may narrow or override
//! what earlier ones set:
//!
//! 1. Everything starts disabled.
//! 2. A new item (or a new key in an item) of a top-level list may be a
//!    play, a block or a task.  Keys already used by the other items rule
//!    kinds out, unless a key is accepted by all three kinds.  If every
//!    kind ends up ruled out, all three are enabled again.
//! 3. Inside the value of a task-list, block-list or role-list key, tasks
//!    (task-list), tasks but not blocks (block-list) or roles (role-list)
//!    are expected.
//! 4. After `action:` or `local_action:`, a module name is expected.
//! 5. Inside the value of a key naming a known module (or inside `args:`
//!    next to such a key), that module's arguments are expected.
//! 6. Module names and block keys follow tasks unless a rule above decided
//!    them.
//! 7. A mapping that already has a block-only key is not a task.

use crate::catalog::{DirectiveCatalog, ModuleCatalog};
use crate::types::{CompletionContext, EntityKind, Key, Value};

/// Keys whose value is a list of tasks.
pub const TASK_LIST_DIRECTIVES: &[&str] = &["tasks", "pre_tasks", "post_tasks", "handlers"];
/// Keys whose value is a list of block members.
pub const BLOCK_LIST_DIRECTIVES: &[&str] = &["block", "rescue", "always"];
/// Keys whose value is a list of roles.
pub const ROLE_LIST_DIRECTIVES: &[&str] = &["roles"];
/// Keys whose value is a module name.
pub const MODULE_NAME_DIRECTIVES: &[&str] = &["action", "local_action"];
/// Key holding module arguments next to the module key.
pub const PARAMETER_BLOCK_KEY: &str = "args";

/// Entity kinds considered for new top-level items.
const TOP_LEVEL_KINDS: [EntityKind; 3] = [EntityKind::Play, EntityKind::Block, EntityKind::Task];

/// Classify the cursor position described by `trail`.  Never fails.
pub fn classify(
    trail: &[Value],
    directives: &DirectiveCatalog,
    modules: &ModuleCatalog,
) -> CompletionContext {
    let mut context = CompletionContext::default();
    let mut module_decided = false;
    let mut block_decided = false;

    // Entry `n` places from the end (1 is the last).
    let back = |n: usize| trail.len().checked_sub(n).map(|i| &trail[i]);
    let back_str = |n: usize| back(n).and_then(Value::as_str);

    if let Some(Value::Seq(items)) = trail.first() {
        let new_item = trail.len() == 2;
        let new_key = trail.len() == 3 && trail[1].as_map().is_some_and(|m| !m.is_empty());
        if new_item || new_key {
            classify_top_level(&mut context, items, directives);
            block_decided = true;
        }
    }

    if trail.len() >= 5
        && let Some(parent) = back_str(3).or_else(|| back_str(4))
    {
        if TASK_LIST_DIRECTIVES.contains(&parent) {
            context.task = true;
        } else if BLOCK_LIST_DIRECTIVES.contains(&parent) {
            context.task = true;
            context.block = false;
            block_decided = true;
        } else if ROLE_LIST_DIRECTIVES.contains(&parent) {
            context.role = true;
        }
    }

    if trail.len() >= 4 && back_str(2).is_some_and(|key| MODULE_NAME_DIRECTIVES.contains(&key)) {
        context.module = true;
        module_decided = true;
    }

    if trail.len() >= 4 {
        let named = match (back_str(2), back_str(3)) {
            (Some(name), _) => Some((name, 2)),
            (None, Some(name)) => Some((name, 3)),
            (None, None) => None,
        };
        if let Some((name, n)) = named {
            let candidates: Vec<&str> = if name == PARAMETER_BLOCK_KEY {
                back(n + 1)
                    .and_then(Value::as_map)
                    .map(|siblings| siblings.keys().filter_map(Key::as_str).collect())
                    .unwrap_or_default()
            } else {
                vec![name]
            };
            context.module_arg = candidates
                .into_iter()
                .find_map(|candidate| modules.get(candidate))
                .cloned();
        }
    }

    if !module_decided {
        context.module = context.task;
    }
    if !block_decided {
        context.block = context.task;
    }

    if context.task
        && let Some(Value::Map(enclosing)) = back(2)
        && enclosing
            .keys()
            .filter_map(Key::as_str)
            .any(|key| BLOCK_LIST_DIRECTIVES.contains(&key))
    {
        context.task = false;
    }

    context
}

/// Rule 2: narrow play/block/task using the keys of the existing items.
fn classify_top_level(context: &mut CompletionContext, items: &[Value], directives: &DirectiveCatalog) {
    let mut enabled = [true; 3];

    for sibling in items.iter().filter_map(Value::as_map) {
        for key in sibling.keys().filter_map(Key::as_str) {
            let rejected: Vec<usize> = TOP_LEVEL_KINDS
                .iter()
                .enumerate()
                .filter(|(_, kind)| !directives.accepts(**kind, key))
                .map(|(i, _)| i)
                .collect();
            // Keys accepted by every kind, or by none, tell us nothing.
            if rejected.len() < TOP_LEVEL_KINDS.len() {
                for i in rejected {
                    enabled[i] = false;
                }
            }
        }
    }

    if enabled.iter().all(|on| !on) {
        enabled = [true; 3];
    }
    let [play, block, task] = enabled;
    context.play = play;
    context.block = block;
    context.task = task;
}

// ─── Tests ──────────────────────────────────────────────────────────────────
