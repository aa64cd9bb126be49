//! The logic engine's operation catalog (§4.2): one [`FunctionKind`] variant
//! per op, each wrapping the op's own parameter/state struct. Dispatch is a
//! single flat match — no nested tag-within-tag indirection.

pub mod arithmetic;
pub mod boolean;
pub mod channel_ops;
pub mod common;
pub mod comparison;
pub mod control;
pub mod control_flow;
pub mod filters;
pub mod scaling;
pub mod state;
pub mod tables;
pub mod utility;

use common::{Inputs, StepCtx, StepOutput};

/// Every concrete op kind the logic engine can evaluate, grouped in
/// source order to mirror the id-range table.
#[derive(Debug, Clone)]
pub enum FunctionKind {
    // 0x00-0x0F Arithmetic
    Add(arithmetic::Add),
    Sub(arithmetic::Sub),
    Mul(arithmetic::Mul),
    Div(arithmetic::Div),
    Min(arithmetic::MinOp),
    Max(arithmetic::MaxOp),
    Avg(arithmetic::Avg),
    WeightedAvg(arithmetic::WeightedAvg),
    Abs(arithmetic::AbsOp),
    Negate(arithmetic::Negate),
    IncrDecr(arithmetic::IncrDecr),

    // 0x20-0x2F Comparison
    Gt(comparison::Gt),
    Ge(comparison::Ge),
    Lt(comparison::Lt),
    Le(comparison::Le),
    Eq(comparison::EqOp),
    Ne(comparison::Ne),
    InRange(comparison::InRange),
    OutOfRange(comparison::OutOfRange),

    // 0x40-0x4F Boolean
    And(boolean::And),
    Or(boolean::Or),
    Xor(boolean::Xor),
    Nand(boolean::Nand),
    Nor(boolean::Nor),
    Not(boolean::Not),
    IsTrue(boolean::IsTrue),
    IsFalse(boolean::IsFalse),

    // 0x50-0x5F Control flow
    IfThenElse(control_flow::IfThenElse),
    Select(control_flow::Select),
    Mux(control_flow::Mux),
    PriorityEncoder(control_flow::PriorityEncoder),
    SwitchCase(control_flow::SwitchCase),
    ThresholdSelect(control_flow::ThresholdSelect),
    ConditionalEnable(control_flow::ConditionalEnable),
    Sequence(control_flow::Sequence),

    // 0x60-0x6F Tables
    Table1d(tables::Table1d),
    Table2d(tables::Table2d),
    CurveFit(tables::CurveFit),

    // 0x70-0x8F Filters
    MovingAvg(filters::MovingAvg),
    ExponentialFilter(filters::ExponentialFilter),
    RateLimit(filters::RateLimit),
    Deadband(filters::Deadband),
    Median(filters::Median),
    Hysteresis(filters::Hysteresis),
    Derivative(filters::Derivative),
    Integral(filters::Integral),

    // 0xA0-0xAF Control
    Pid(control::Pid),
    BangBang(control::BangBang),
    PwmDutyMap(control::PwmDutyMap),
    SoftStart(control::SoftStart),
    CurrentLimiter(control::CurrentLimiter),
    HbridgeCombiner(control::HbridgeCombiner),
    WiperSequencer(control::WiperSequencer),
    Cruise(control::Cruise),
    Boost(control::Boost),
    Lambda(control::Lambda),

    // 0xC0-0xCF State
    SrLatch(state::SrLatch),
    Toggle(state::Toggle),
    Pulse(state::Pulse),
    DelayOn(state::DelayOn),
    DelayOff(state::DelayOff),
    Flasher(state::Flasher),
    Counter(state::Counter),
    Timer(state::Timer),
    StateMachine(state::StateMachine),
    Memory(state::Memory),
    PeakHold(state::PeakHold),
    MinHold(state::MinHold),

    // 0xD0-0xDF Channel ops
    ChannelSum(channel_ops::ChannelSum),
    ChannelMin(channel_ops::ChannelMin),
    ChannelMax(channel_ops::ChannelMax),
    ChannelAvg(channel_ops::ChannelAvg),
    Diff(channel_ops::Diff),
    RedundancyCheck(channel_ops::RedundancyCheck),
    SensorSelect(channel_ops::SensorSelect),
    ChannelSync(channel_ops::ChannelSync),
    GangControl(channel_ops::GangControl),
    LoadBalance(channel_ops::LoadBalance),
    FaultAggregate(channel_ops::FaultAggregate),
    CurrentLimitManager(channel_ops::CurrentLimitManager),

    // 0xE0-0xEF I/O scaling
    Copy(scaling::Copy_),
    Scale(scaling::Scale),
    Clamp(scaling::Clamp),
    Invert(scaling::Invert),
    Map(scaling::Map),
    Sign(scaling::Sign),

    // 0xF0-0xFF Utility
    Constant(utility::Constant),
    SystemTime(utility::SystemTime),
    Rtc(utility::Rtc),
    Random(utility::Random),
    Watchdog(utility::Watchdog),
    Heartbeat(utility::Heartbeat),
    BitExtract(utility::BitExtract),
    BitPack(utility::BitPack),
    ConditionCount(utility::ConditionCount),
    RampGenerator(utility::RampGenerator),
    PwmGenerator(utility::PwmGenerator),
    ChannelStatus(utility::ChannelStatus),
    Nop(utility::Nop),
}

impl FunctionKind {
    /// Evaluates this op against the resolved input values for the
    /// current cycle. Never allocates and never fails — out-of-range
    /// parameters were rejected at registration time (§7).
    pub fn step(&mut self, inputs: &Inputs, ctx: StepCtx) -> StepOutput {
        match self {
            FunctionKind::Add(f) => f.step(inputs, ctx),
            FunctionKind::Sub(f) => f.step(inputs, ctx),
            FunctionKind::Mul(f) => f.step(inputs, ctx),
            FunctionKind::Div(f) => f.step(inputs, ctx),
            FunctionKind::Min(f) => f.step(inputs, ctx),
            FunctionKind::Max(f) => f.step(inputs, ctx),
            FunctionKind::Avg(f) => f.step(inputs, ctx),
            FunctionKind::WeightedAvg(f) => f.step(inputs, ctx),
            FunctionKind::Abs(f) => f.step(inputs, ctx),
            FunctionKind::Negate(f) => f.step(inputs, ctx),
            FunctionKind::IncrDecr(f) => f.step_fn(inputs, ctx),

            FunctionKind::Gt(f) => f.step(inputs, ctx),
            FunctionKind::Ge(f) => f.step(inputs, ctx),
            FunctionKind::Lt(f) => f.step(inputs, ctx),
            FunctionKind::Le(f) => f.step(inputs, ctx),
            FunctionKind::Eq(f) => f.step(inputs, ctx),
            FunctionKind::Ne(f) => f.step(inputs, ctx),
            FunctionKind::InRange(f) => f.step(inputs, ctx),
            FunctionKind::OutOfRange(f) => f.step(inputs, ctx),

            FunctionKind::And(f) => f.step(inputs, ctx),
            FunctionKind::Or(f) => f.step(inputs, ctx),
            FunctionKind::Xor(f) => f.step(inputs, ctx),
            FunctionKind::Nand(f) => f.step(inputs, ctx),
            FunctionKind::Nor(f) => f.step(inputs, ctx),
            FunctionKind::Not(f) => f.step(inputs, ctx),
            FunctionKind::IsTrue(f) => f.step(inputs, ctx),
            FunctionKind::IsFalse(f) => f.step(inputs, ctx),

            FunctionKind::IfThenElse(f) => f.step(inputs, ctx),
            FunctionKind::Select(f) => f.step(inputs, ctx),
            FunctionKind::Mux(f) => f.step(inputs, ctx),
            FunctionKind::PriorityEncoder(f) => f.step(inputs, ctx),
            FunctionKind::SwitchCase(f) => f.step(inputs, ctx),
            FunctionKind::ThresholdSelect(f) => f.step(inputs, ctx),
            FunctionKind::ConditionalEnable(f) => f.step(inputs, ctx),
            FunctionKind::Sequence(f) => f.step(inputs, ctx),

            FunctionKind::Table1d(f) => f.step(inputs, ctx),
            FunctionKind::Table2d(f) => f.step(inputs, ctx),
            FunctionKind::CurveFit(f) => f.step(inputs, ctx),

            FunctionKind::MovingAvg(f) => f.step(inputs, ctx),
            FunctionKind::ExponentialFilter(f) => f.step(inputs, ctx),
            FunctionKind::RateLimit(f) => f.step(inputs, ctx),
            FunctionKind::Deadband(f) => f.step(inputs, ctx),
            FunctionKind::Median(f) => f.step(inputs, ctx),
            FunctionKind::Hysteresis(f) => f.step(inputs, ctx),
            FunctionKind::Derivative(f) => f.step(inputs, ctx),
            FunctionKind::Integral(f) => f.step(inputs, ctx),

            FunctionKind::Pid(f) => f.step(inputs, ctx),
            FunctionKind::BangBang(f) => f.step(inputs, ctx),
            FunctionKind::PwmDutyMap(f) => f.step(inputs, ctx),
            FunctionKind::SoftStart(f) => f.step(inputs, ctx),
            FunctionKind::CurrentLimiter(f) => f.step(inputs, ctx),
            FunctionKind::HbridgeCombiner(f) => f.step(inputs, ctx),
            FunctionKind::WiperSequencer(f) => f.step(inputs, ctx),
            FunctionKind::Cruise(f) => f.step(inputs, ctx),
            FunctionKind::Boost(f) => f.step(inputs, ctx),
            FunctionKind::Lambda(f) => f.step(inputs, ctx),

            FunctionKind::SrLatch(f) => f.step(inputs, ctx),
            FunctionKind::Toggle(f) => f.step(inputs, ctx),
            FunctionKind::Pulse(f) => f.step(inputs, ctx),
            FunctionKind::DelayOn(f) => f.step(inputs, ctx),
            FunctionKind::DelayOff(f) => f.step(inputs, ctx),
            FunctionKind::Flasher(f) => f.step(inputs, ctx),
            FunctionKind::Counter(f) => f.step(inputs, ctx),
            FunctionKind::Timer(f) => f.step(inputs, ctx),
            FunctionKind::StateMachine(f) => f.step(inputs, ctx),
            FunctionKind::Memory(f) => f.step(inputs, ctx),
            FunctionKind::PeakHold(f) => f.step(inputs, ctx),
            FunctionKind::MinHold(f) => f.step(inputs, ctx),

            FunctionKind::ChannelSum(f) => f.step(inputs, ctx),
            FunctionKind::ChannelMin(f) => f.step(inputs, ctx),
            FunctionKind::ChannelMax(f) => f.step(inputs, ctx),
            FunctionKind::ChannelAvg(f) => f.step(inputs, ctx),
            FunctionKind::Diff(f) => f.step(inputs, ctx),
            FunctionKind::RedundancyCheck(f) => f.step(inputs, ctx),
            FunctionKind::SensorSelect(f) => f.step(inputs, ctx),
            FunctionKind::ChannelSync(f) => f.step(inputs, ctx),
            FunctionKind::GangControl(f) => f.step(inputs, ctx),
            FunctionKind::LoadBalance(f) => f.step(inputs, ctx),
            FunctionKind::FaultAggregate(f) => f.step(inputs, ctx),
            FunctionKind::CurrentLimitManager(f) => f.step(inputs, ctx),

            FunctionKind::Copy(f) => f.step(inputs, ctx),
            FunctionKind::Scale(f) => f.step(inputs, ctx),
            FunctionKind::Clamp(f) => f.step(inputs, ctx),
            FunctionKind::Invert(f) => f.step(inputs, ctx),
            FunctionKind::Map(f) => f.step(inputs, ctx),
            FunctionKind::Sign(f) => f.step(inputs, ctx),

            FunctionKind::Constant(f) => f.step(inputs, ctx),
            FunctionKind::SystemTime(f) => f.step(inputs, ctx),
            FunctionKind::Rtc(f) => f.step(inputs, ctx),
            FunctionKind::Random(f) => f.step(inputs, ctx),
            FunctionKind::Watchdog(f) => f.step(inputs, ctx),
            FunctionKind::Heartbeat(f) => f.step(inputs, ctx),
            FunctionKind::BitExtract(f) => f.step(inputs, ctx),
            FunctionKind::BitPack(f) => f.step(inputs, ctx),
            FunctionKind::ConditionCount(f) => f.step(inputs, ctx),
            FunctionKind::RampGenerator(f) => f.step(inputs, ctx),
            FunctionKind::PwmGenerator(f) => f.step(inputs, ctx),
            FunctionKind::ChannelStatus(f) => f.step(inputs, ctx),
            FunctionKind::Nop(f) => f.step(inputs, ctx),
        }
    }
}

pub const MAX_FUNCTIONS: usize = 64;

/// One row of the logic engine's function table (§3.2).
#[derive(Debug, Clone)]
pub struct Function {
    pub function_id: u8,
    pub enabled: bool,
    pub input_channel_ids: heapless::Vec<u16, { common::MAX_INPUTS }>,
    pub output_channel_id: u16,
    pub secondary_output_channel_id: Option<u16>,
    pub kind: FunctionKind,
}
