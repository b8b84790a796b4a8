use sea_orm::Condition;
use sea_orm::sea_query::{ConditionExpression, Expr, ExprTrait, SimpleExpr};

use crate::domain::filter::value_objects::{CompareOp, ConditionNode, ConditionSet, ConditionValue, Conjunction};

/// The derived conditions as a sea-orm condition, top-level entries ANDed
/// together. Condition expressions stay the raw SQL fragments they were
/// derived as, so computed expressions like `DATE(...)` pass through.
impl From<&ConditionSet> for Condition {
    fn from(set: &ConditionSet) -> Self {
        let mut condition = Condition::all();
        for (_, node) in set.iter() {
            condition = condition.add(ConditionExpression::from(node));
        }
        condition
    }
}

impl From<&ConditionNode> for ConditionExpression {
    fn from(node: &ConditionNode) -> Self {
        match node {
            ConditionNode::Compare { expr, op, value } => compare_expr(expr, *op, value).into(),
            ConditionNode::Group { conjunction, nodes } => {
                let mut condition = match conjunction {
                    Conjunction::And => Condition::all(),
                    Conjunction::Or => Condition::any(),
                };
                for child in nodes {
                    condition = condition.add(ConditionExpression::from(child));
                }
                condition.into()
            }
        }
    }
}

fn compare_expr(expr: &str, op: CompareOp, value: &ConditionValue) -> SimpleExpr {
    let column = Expr::cust(expr);
    match value {
        ConditionValue::List(values) => column.is_in(values.iter().map(String::as_str)),
        ConditionValue::Scalar(v) => match op {
            CompareOp::Eq => column.eq(v.as_str()),
            CompareOp::Like => column.like(v.as_str()),
            CompareOp::In => column.is_in([v.as_str()]),
            CompareOp::GreaterOrEqual => column.gte(v.as_str()),
            CompareOp::LessOrEqual => column.lte(v.as_str()),
        },
    }
}
