use crate::error::EvmResult;
use crate::execution::HaltReason;
use ethereum_types::U256;

pub const STACK_LIMIT: usize = 1024;

#[derive(Debug, Clone)]
pub struct Stack {
    data: Vec<U256>,
}

impl Stack {
    pub fn new() -> Self {
        Self {
            data: Vec::with_capacity(32),
        }
    }

    /// Checks that `required` items can be popped and that pushing `pushes`
    /// afterwards stays within the limit. Runs before an instruction touches
    /// the stack so a failing check leaves it unchanged.
    pub fn verify(&self, required: usize, pushes: usize) -> EvmResult<()> {
        let len = self.data.len();
        if len < required {
            return Err(HaltReason::StackUnderflow.into());
        }
        if len - required + pushes > STACK_LIMIT {
            return Err(HaltReason::StackOverflow.into());
        }
        Ok(())
    }

    pub fn push(&mut self, value: U256) -> EvmResult<()> {
        if self.data.len() >= STACK_LIMIT {
            return Err(HaltReason::StackOverflow.into());
        }
        self.data.push(value);
        Ok(())
    }

    pub fn pop(&mut self) -> EvmResult<U256> {
        self.data.pop().ok_or_else(|| HaltReason::StackUnderflow.into())
    }

    /// Item `index` positions below the top.
    pub fn peek(&self, index: usize) -> EvmResult<U256> {
        let len = self.data.len();
        if index >= len {
            return Err(HaltReason::StackUnderflow.into());
        }
        Ok(self.data[len - 1 - index])
    }

    /// Swaps the top with the item `n` positions below it.
    pub fn swap(&mut self, n: usize) -> EvmResult<()> {
        let len = self.data.len();
        if n >= len {
            return Err(HaltReason::StackUnderflow.into());
        }
        self.data.swap(len - 1, len - 1 - n);
        Ok(())
    }

    /// Pushes a copy of the item `n` positions below the top.
    pub fn dup(&mut self, n: usize) -> EvmResult<()> {
        let value = self.peek(n)?;
        self.push(value)
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// Top-first copy of the contents.
    pub fn snapshot(&self) -> Vec<U256> {
        self.data.iter().rev().copied().collect()
    }
}

impl Default for Stack {
    fn default() -> Self {
        Self::new()
    }
}
