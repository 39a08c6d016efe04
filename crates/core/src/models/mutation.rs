use std::collections::{BTreeSet, HashMap};

use serde::{Deserialize, Serialize};

/// 单个标签组的一次add/remove变更
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TagGroupsMutation {
    pub group: String,
    #[serde(default, skip_serializing_if = "BTreeSet::is_empty")]
    pub add: BTreeSet<String>,
    #[serde(default, skip_serializing_if = "BTreeSet::is_empty")]
    pub remove: BTreeSet<String>,
}

impl TagGroupsMutation {
    pub fn add_tags(group: impl Into<String>, tags: impl IntoIterator<Item = String>) -> Self {
        Self {
            group: group.into(),
            add: tags.into_iter().collect(),
            remove: BTreeSet::new(),
        }
    }

    pub fn remove_tags(group: impl Into<String>, tags: impl IntoIterator<Item = String>) -> Self {
        Self {
            group: group.into(),
            add: BTreeSet::new(),
            remove: tags.into_iter().collect(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.add.is_empty() && self.remove.is_empty()
    }
}

/// 变更序列中单个标签的最终操作
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum TagOp {
    Add,
    Remove,
}

/// 将变更序列折叠为等价的最小序列。
///
/// 按入队顺序逐条应用，同组内对同一标签后写覆盖先写，先add后remove
/// 时add被抵消，仅保留最终操作。每个组折叠为至多一条变更，组间顺序
/// 保持首次出现的顺序。折叠是幂等的：collapse(collapse(s)) == collapse(s)。
pub fn collapse_mutations(mutations: Vec<TagGroupsMutation>) -> Vec<TagGroupsMutation> {
    let mut group_order: Vec<String> = Vec::new();
    let mut ops: HashMap<String, HashMap<String, TagOp>> = HashMap::new();

    for mutation in mutations {
        if mutation.is_empty() {
            continue;
        }
        if !ops.contains_key(&mutation.group) {
            group_order.push(mutation.group.clone());
        }
        let group_ops = ops.entry(mutation.group.clone()).or_default();
        for tag in mutation.add {
            group_ops.insert(tag, TagOp::Add);
        }
        for tag in mutation.remove {
            group_ops.insert(tag, TagOp::Remove);
        }
    }

    group_order
        .into_iter()
        .filter_map(|group| {
            let group_ops = ops.remove(&group)?;
            let mut collapsed = TagGroupsMutation {
                group,
                add: BTreeSet::new(),
                remove: BTreeSet::new(),
            };
            for (tag, op) in group_ops {
                match op {
                    TagOp::Add => collapsed.add.insert(tag),
                    TagOp::Remove => collapsed.remove.insert(tag),
                };
            }
            if collapsed.is_empty() {
                None
            } else {
                Some(collapsed)
            }
        })
        .collect()
}
