// ==========================================
// TIKTUY 批量导入 - 重复订单提示
// ==========================================
// 职责: 检测同一文件内疑似重复的订单组（客户 + 地址 + 日期）
// 红线: 仅作提示，不影响行的有效性，也不阻止提交
// ==========================================

use crate::domain::preview::OrderGroup;
use crate::importer::normalize::normalize_key;
use serde::Serialize;
use std::collections::HashMap;

/// 疑似重复: `duplicate` 与更早出现的 `first` 键相同
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct DuplicateHint {
    pub first: usize,
    pub duplicate: usize,
}

fn order_key(group: &OrderGroup) -> Option<String> {
    let cliente = normalize_key(&group.cliente);
    let direccion = normalize_key(&group.direccion);
    if cliente.is_empty() || direccion.is_empty() {
        return None;
    }
    Some(format!(
        "{}|{}|{}",
        cliente,
        direccion,
        normalize_key(&group.fecha_entrega)
    ))
}

/// 检测同批次内的疑似重复订单
///
/// # 返回
/// - Vec<DuplicateHint>: 重复记录（不包括第一次出现），按下标升序
pub fn find_duplicate_orders(groups: &[OrderGroup]) -> Vec<DuplicateHint> {
    let mut first_occurrence: HashMap<String, usize> = HashMap::new();
    let mut duplicates = Vec::new();

    for (idx, group) in groups.iter().enumerate() {
        let Some(key) = order_key(group) else {
            continue;
        };
        match first_occurrence.get(&key) {
            Some(&first) => duplicates.push(DuplicateHint {
                first,
                duplicate: idx,
            }),
            None => {
                first_occurrence.insert(key, idx);
            }
        }
    }

    duplicates
}
