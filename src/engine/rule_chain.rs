// ==========================================
// 不良品追踪系统 - 通用规则链
// ==========================================
// 职责: 有序 (规则名, 谓词) 列表,首个命中即返回
// 红线: 规则无副作用;每次命中必须输出规则名作为 reason
// ==========================================

/// 单条规则: 命中返回 Some(输出),未命中返回 None
pub struct Rule<C, O> {
    name: &'static str,
    eval: Box<dyn Fn(&C) -> Option<O> + Send + Sync>,
}

/// 规则命中结果
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RuleHit<O> {
    pub output: O,
    pub reason: &'static str,
}

// ==========================================
// RuleChain - 首个命中即胜的规则链
// ==========================================
pub struct RuleChain<C, O> {
    rules: Vec<Rule<C, O>>,
}

impl<C, O> RuleChain<C, O> {
    /// 创建空规则链
    pub fn new() -> Self {
        Self { rules: Vec::new() }
    }

    /// 追加一条规则(顺序即优先级)
    pub fn rule<F>(mut self, name: &'static str, eval: F) -> Self
    where
        F: Fn(&C) -> Option<O> + Send + Sync + 'static,
    {
        self.rules.push(Rule {
            name,
            eval: Box::new(eval),
        });
        self
    }

    /// 求值: 按序尝试,首个 Some 即返回
    pub fn evaluate(&self, ctx: &C) -> Option<RuleHit<O>> {
        for rule in &self.rules {
            if let Some(output) = (rule.eval)(ctx) {
                return Some(RuleHit {
                    output,
                    reason: rule.name,
                });
            }
        }
        None
    }

    /// 求值, 无命中时落入显式默认值 (reason = "DEFAULT")
    pub fn evaluate_or(&self, ctx: &C, default: O) -> RuleHit<O> {
        self.evaluate(ctx).unwrap_or(RuleHit {
            output: default,
            reason: "DEFAULT",
        })
    }
}

impl<C, O> Default for RuleChain<C, O> {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_first_match_wins() {
        let chain: RuleChain<i32, &'static str> = RuleChain::new()
            .rule("NEGATIVE", |n| if *n < 0 { Some("neg") } else { None })
            .rule("SMALL", |n| if *n < 10 { Some("small") } else { None })
            .rule("ANY", |_| Some("any"));

        assert_eq!(
            chain.evaluate(&-5),
            Some(RuleHit {
                output: "neg",
                reason: "NEGATIVE"
            })
        );
        assert_eq!(chain.evaluate(&5).unwrap().reason, "SMALL");
        assert_eq!(chain.evaluate(&50).unwrap().reason, "ANY");
    }

    #[test]
    fn test_default_branch() {
        let chain: RuleChain<i32, &'static str> =
            RuleChain::new().rule("NEVER", |_| None);

        let hit = chain.evaluate_or(&1, "fallback");
        assert_eq!(hit.output, "fallback");
        assert_eq!(hit.reason, "DEFAULT");
    }
}
