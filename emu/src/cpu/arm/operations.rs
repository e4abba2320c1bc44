use logger::{error, important, warning};

use crate::bitwise::Bits;
use crate::bus::Bus;
use crate::cpu::arm::alu_instruction::{
    shift, AluInstructionKind, AluSecondOperandInfo, ArithmeticOpResult, ArmModeAluInstruction,
    Kind, PsrKind, PsrOpKind, ShiftOperator,
};
use crate::cpu::arm::instructions::{
    ArmModeMultiplyLongVariant, ArmModeMultiplyVariant, HalfwordTransferKind,
    SingleDataTransferKind, SingleDataTransferOffsetInfo,
};
use crate::cpu::arm7tdmi::Arm7tdmi;
use crate::cpu::cpu_modes::Mode;
use crate::cpu::flags::{
    HalfwordDataTransferOffsetKind, Indexing, LoadStoreKind, Offsetting, ReadWriteKind,
};
use crate::cpu::psr::{CpuState, Psr};
use crate::cpu::registers::{REG_LR, REG_PROGRAM_COUNTER};

impl Arm7tdmi {
    pub fn data_processing(
        &mut self,
        alu_instruction: ArmModeAluInstruction,
        set_conditions: bool,
        rn: u32,
        destination: u32,
        op2: AluSecondOperandInfo,
    ) {
        let shift_by_register = matches!(
            op2,
            AluSecondOperandInfo::Register {
                shift_op: ShiftOperator::Register(_),
                ..
            }
        );

        let mut op1 = self.reg(rn as usize);
        if rn == REG_PROGRAM_COUNTER && shift_by_register {
            // A register-specified shift costs an extra cycle, so PC
            // reads 12 ahead of the instruction instead of 8.
            op1 = op1.wrapping_add(4);
        }

        let op2 = self.get_operand(alu_instruction, set_conditions, op2);

        let mut set_conditions = set_conditions;
        if set_conditions && destination == REG_PROGRAM_COUNTER {
            // The exception-return idiom: `SUBS PC, LR, #n` and friends
            // restore CPSR from the current mode's SPSR.
            if matches!(self.cpsr.mode(), Mode::User | Mode::System) {
                error("S=1 with R15 destination outside an exception mode");
            } else {
                let spsr = self.spsr;
                self.swap_mode(spsr.mode());
                self.cpsr = spsr;
            }
            set_conditions = false;
        }

        use ArmModeAluInstruction::*;
        match alu_instruction {
            And => self.and(destination as usize, op1, op2, set_conditions),
            Eor => self.eor(destination as usize, op1, op2, set_conditions),
            Sub => self.sub(destination as usize, op1, op2, set_conditions),
            Rsb => self.rsb(destination as usize, op1, op2, set_conditions),
            Add => self.add(destination as usize, op1, op2, set_conditions),
            Adc => self.adc(destination as usize, op1, op2, set_conditions),
            Sbc => self.sbc(destination as usize, op1, op2, set_conditions),
            Rsc => self.rsc(destination as usize, op1, op2, set_conditions),
            Tst => self.tst(op1, op2),
            Teq => self.teq(op1, op2),
            Cmp => self.cmp(op1, op2),
            Cmn => self.cmn(op1, op2),
            Orr => self.orr(destination as usize, op1, op2, set_conditions),
            Mov => self.mov(destination as usize, op2, set_conditions),
            Bic => self.bic(destination as usize, op1, op2, set_conditions),
            Mvn => self.mvn(destination as usize, op2, set_conditions),
        }

        // The test instructions never write the destination, so only the
        // others have to keep a written PC executable.
        if destination == REG_PROGRAM_COUNTER && !matches!(alu_instruction, Tst | Teq | Cmp | Cmn) {
            let pc = self.reg(15);
            if pc.get_bit(0) {
                self.cpsr.set_cpu_state(CpuState::Thumb);
                self.set_reg(15, pc & !0b1);
            } else if self.cpsr.cpu_state() == CpuState::Thumb {
                self.set_reg(15, pc & !0b1);
            } else {
                self.set_reg(15, pc & !0b11);
            }
        }
    }

    /// Resolve the second operand, including the barrel shift. A logical
    /// instruction with S set takes its carry from the shifter, which is
    /// written here.
    pub(crate) fn get_operand(
        &mut self,
        alu_instruction: ArmModeAluInstruction,
        set_conditions: bool,
        op2: AluSecondOperandInfo,
    ) -> u32 {
        match op2 {
            AluSecondOperandInfo::Immediate { base, shift } => base.rotate_right(shift),
            AluSecondOperandInfo::Register {
                shift_op,
                shift_kind,
                register,
            } => {
                let mut rm = self.reg(register as usize);

                let shift_amount = match shift_op {
                    ShiftOperator::Immediate(amount) => amount,
                    ShiftOperator::Register(shift_register) => {
                        if shift_register == REG_PROGRAM_COUNTER {
                            error("shift amount register should not be R15");
                        }
                        if register == REG_PROGRAM_COUNTER {
                            // See `data_processing`: +12 instead of +8.
                            rm = rm.wrapping_add(4);
                        }

                        let amount = self.reg(shift_register as usize) & 0xFF;
                        if amount == 0 {
                            // Shift by a register holding 0: the value is
                            // used as-is and carry is untouched.
                            return rm;
                        }
                        amount
                    }
                };

                let result = shift(shift_kind, shift_amount, rm, self.cpsr.carry_flag());

                if set_conditions && alu_instruction.kind() == AluInstructionKind::Logical {
                    self.cpsr.set_carry_flag(result.carry);
                }

                result.result
            }
        }
    }

    fn set_logical_flags(&mut self, result: u32) {
        self.cpsr.set_sign_flag(result.get_bit(31));
        self.cpsr.set_zero_flag(result == 0);
    }

    pub(crate) fn add_inner_op(first_op: u32, second_op: u32) -> ArithmeticOpResult {
        let result = first_op.wrapping_add(second_op);

        ArithmeticOpResult {
            result,
            carry: (first_op as u64 + second_op as u64) > 0xFFFF_FFFF,
            overflow: (first_op.get_bit(31) == second_op.get_bit(31))
                && (result.get_bit(31) != first_op.get_bit(31)),
            sign: result.get_bit(31),
            zero: result == 0,
        }
    }

    pub(crate) fn sub_inner_op(first_op: u32, second_op: u32) -> ArithmeticOpResult {
        let result = first_op.wrapping_sub(second_op);

        ArithmeticOpResult {
            result,
            // C is the no-borrow flag on subtraction.
            carry: second_op <= first_op,
            overflow: (first_op.get_bit(31) != second_op.get_bit(31))
                && (result.get_bit(31) != first_op.get_bit(31)),
            sign: result.get_bit(31),
            zero: result == 0,
        }
    }

    /// ADC treats the incoming carry as a third operand; the flags are
    /// computed against the effective second operand `op2 + C`.
    pub(crate) fn adc_inner_op(first_op: u32, second_op: u32, carry_in: bool) -> ArithmeticOpResult {
        let total = first_op as u64 + second_op as u64 + carry_in as u64;
        let result = total as u32;
        let effective_second = second_op.wrapping_add(carry_in as u32);

        ArithmeticOpResult {
            result,
            carry: total > 0xFFFF_FFFF,
            overflow: (first_op.get_bit(31) == effective_second.get_bit(31))
                && (result.get_bit(31) != first_op.get_bit(31)),
            sign: result.get_bit(31),
            zero: result == 0,
        }
    }

    /// SBC subtracts the inverted carry; the flags are computed against
    /// the effective second operand `op2 + (1 - C)`.
    pub(crate) fn sbc_inner_op(first_op: u32, second_op: u32, carry_in: bool) -> ArithmeticOpResult {
        let borrow = u32::from(!carry_in);
        let result = first_op.wrapping_sub(second_op).wrapping_sub(borrow);
        let effective_second = second_op.wrapping_add(borrow);

        ArithmeticOpResult {
            result,
            carry: (second_op as u64 + borrow as u64) <= first_op as u64,
            overflow: (first_op.get_bit(31) != effective_second.get_bit(31))
                && (result.get_bit(31) != first_op.get_bit(31)),
            sign: result.get_bit(31),
            zero: result == 0,
        }
    }

    pub(crate) fn and(&mut self, rd: usize, rn: u32, op2: u32, s: bool) {
        let result = rn & op2;
        self.set_reg(rd, result);
        if s {
            self.set_logical_flags(result);
        }
    }

    pub(crate) fn eor(&mut self, rd: usize, rn: u32, op2: u32, s: bool) {
        let result = rn ^ op2;
        self.set_reg(rd, result);
        if s {
            self.set_logical_flags(result);
        }
    }

    fn sub(&mut self, rd: usize, rn: u32, op2: u32, s: bool) {
        let op_result = Self::sub_inner_op(rn, op2);
        self.set_reg(rd, op_result.result);
        if s {
            self.cpsr.set_flags(&op_result);
        }
    }

    fn rsb(&mut self, rd: usize, rn: u32, op2: u32, s: bool) {
        let op_result = Self::sub_inner_op(op2, rn);
        self.set_reg(rd, op_result.result);
        if s {
            self.cpsr.set_flags(&op_result);
        }
    }

    fn add(&mut self, rd: usize, rn: u32, op2: u32, s: bool) {
        let op_result = Self::add_inner_op(rn, op2);
        self.set_reg(rd, op_result.result);
        if s {
            self.cpsr.set_flags(&op_result);
        }
    }

    fn adc(&mut self, rd: usize, rn: u32, op2: u32, s: bool) {
        let op_result = Self::adc_inner_op(rn, op2, self.cpsr.carry_flag());
        self.set_reg(rd, op_result.result);
        if s {
            self.cpsr.set_flags(&op_result);
        }
    }

    fn sbc(&mut self, rd: usize, rn: u32, op2: u32, s: bool) {
        let op_result = Self::sbc_inner_op(rn, op2, self.cpsr.carry_flag());
        self.set_reg(rd, op_result.result);
        if s {
            self.cpsr.set_flags(&op_result);
        }
    }

    fn rsc(&mut self, rd: usize, rn: u32, op2: u32, s: bool) {
        let op_result = Self::sbc_inner_op(op2, rn, self.cpsr.carry_flag());
        self.set_reg(rd, op_result.result);
        if s {
            self.cpsr.set_flags(&op_result);
        }
    }

    pub(crate) fn tst(&mut self, rn: u32, op2: u32) {
        self.set_logical_flags(rn & op2);
    }

    fn teq(&mut self, rn: u32, op2: u32) {
        self.set_logical_flags(rn ^ op2);
    }

    pub(crate) fn cmp(&mut self, rn: u32, op2: u32) {
        let op_result = Self::sub_inner_op(rn, op2);
        self.cpsr.set_flags(&op_result);
    }

    fn cmn(&mut self, rn: u32, op2: u32) {
        let op_result = Self::add_inner_op(rn, op2);
        self.cpsr.set_flags(&op_result);
    }

    pub(crate) fn orr(&mut self, rd: usize, rn: u32, op2: u32, s: bool) {
        let result = rn | op2;
        self.set_reg(rd, result);
        if s {
            self.set_logical_flags(result);
        }
    }

    fn mov(&mut self, rd: usize, op2: u32, s: bool) {
        self.set_reg(rd, op2);
        if s {
            self.set_logical_flags(op2);
        }
    }

    fn bic(&mut self, rd: usize, rn: u32, op2: u32, s: bool) {
        let result = rn & !op2;
        self.set_reg(rd, result);
        if s {
            self.set_logical_flags(result);
        }
    }

    pub(crate) fn mvn(&mut self, rd: usize, op2: u32, s: bool) {
        let result = !op2;
        self.set_reg(rd, result);
        if s {
            self.set_logical_flags(result);
        }
    }

    pub fn psr_transfer(&mut self, op_kind: PsrOpKind, psr_kind: PsrKind) {
        match op_kind {
            PsrOpKind::Mrs {
                destination_register,
            } => {
                if destination_register == REG_PROGRAM_COUNTER {
                    error("MRS destination register should not be R15");
                }

                let psr = match psr_kind {
                    PsrKind::Cpsr => self.cpsr,
                    PsrKind::Spsr => {
                        if matches!(self.cpsr.mode(), Mode::User | Mode::System) {
                            error("SPSR does not exist in User/System mode");
                            return;
                        }
                        self.spsr
                    }
                };

                self.set_reg(destination_register as usize, psr.into());
            }
            PsrOpKind::Msr { source_register } => {
                if source_register == REG_PROGRAM_COUNTER {
                    error("MSR source register should not be R15");
                }

                let value = self.reg(source_register as usize);
                self.write_psr(value, psr_kind, 0b1111);
            }
            PsrOpKind::MsrFlg {
                operand,
                field_mask,
            } => {
                let value = match operand {
                    AluSecondOperandInfo::Register { register, .. } => self.reg(register as usize),
                    AluSecondOperandInfo::Immediate { base, shift } => base.rotate_right(shift),
                };

                self.write_psr(value, psr_kind, field_mask);
            }
        }
    }

    /// Write the selected bytes of CPSR or SPSR. Mode changes swap the
    /// register banks; a T-bit change outside BX is diagnosed and the PC
    /// forced back to alignment.
    fn write_psr(&mut self, value: u32, psr_kind: PsrKind, field_mask: u32) {
        let mut mask = 0u32;
        if field_mask.get_bit(3) {
            mask |= 0xFF00_0000;
        }
        if field_mask.get_bit(2) {
            mask |= 0x00FF_0000;
        }
        if field_mask.get_bit(1) {
            mask |= 0x0000_FF00;
        }
        if field_mask.get_bit(0) {
            mask |= 0x0000_00FF;
        }

        match psr_kind {
            PsrKind::Spsr => {
                if matches!(self.cpsr.mode(), Mode::User | Mode::System) {
                    error("SPSR does not exist in User/System mode");
                    return;
                }

                let raw = (u32::from(self.spsr) & !mask) | (value & mask);
                let mut spsr = Psr::from(raw & !0b11111);
                // The BIOS occasionally writes invalid mode values here.
                spsr.set_mode_raw(raw);
                self.spsr = spsr;
            }
            PsrKind::Cpsr => {
                let mut mask = mask;
                if self.cpsr.mode() == Mode::User {
                    // User mode may only touch the flags.
                    mask &= 0xF000_0000;
                }

                let raw = (u32::from(self.cpsr) & !mask) | (value & mask);
                let new_psr = Psr::from(raw);

                if mask & 0xFF != 0 {
                    self.swap_mode(new_psr.mode());
                }

                let t_changed = new_psr.state_bit() != self.cpsr.state_bit();
                self.cpsr = new_psr;

                if t_changed {
                    // Undefined on the ARM7TDMI without a BX; align the
                    // PC to the new state and restart the pipeline.
                    warning("MSR changed the T bit outside BX, forcing PC alignment");
                    let pc = self.reg(15);
                    let aligned = if self.cpsr.state_bit() {
                        pc & !0b1
                    } else {
                        pc & !0b11
                    };
                    self.set_reg(15, aligned);
                }
            }
        }
    }

    pub fn branch_and_exchange(&mut self, register: usize) {
        if register == 15 {
            error("BX with R15 as input");
        }

        let address = self.reg(register);
        if address.get_bit(0) {
            self.cpsr.set_cpu_state(CpuState::Thumb);
            self.set_reg(15, address & !0b1);
        } else {
            self.cpsr.set_cpu_state(CpuState::Arm);
            self.set_reg(15, address & !0b11);
        }
    }

    pub fn branch(&mut self, is_link: bool, offset: u32) {
        // The decoded offset is 26 bits (24-bit field shifted by 2).
        let offset = offset.sign_extended(26);
        let pc = self.reg(15);

        if is_link {
            // The pipeline keeps PC two instructions ahead; the return
            // address is the one right after the branch.
            self.set_reg(REG_LR, pc.wrapping_sub(4));
        }

        self.set_reg(15, pc.wrapping_add(offset));
    }

    pub fn multiply(
        &mut self,
        variant: ArmModeMultiplyVariant,
        should_set_codes: bool,
        rd: u32,
        rn_accumulate: u32,
        rs: u32,
        rm: u32,
    ) {
        if rd == 15 || rs == 15 || rm == 15 {
            error("multiply with R15 operand");
        }

        let rm_value = self.reg(rm as usize);
        let rs_value = self.reg(rs as usize);

        let result = match variant {
            ArmModeMultiplyVariant::Mul => rm_value.wrapping_mul(rs_value),
            ArmModeMultiplyVariant::Mla => rm_value
                .wrapping_mul(rs_value)
                .wrapping_add(self.reg(rn_accumulate as usize)),
        };

        self.set_reg(rd as usize, result);

        if should_set_codes {
            // The carry flag is meaningless after a multiply and is left
            // alone, as is V.
            self.set_logical_flags(result);
        }
    }

    pub fn multiply_long(
        &mut self,
        variant: ArmModeMultiplyLongVariant,
        should_set_codes: bool,
        rdhi: u32,
        rdlo: u32,
        rs: u32,
        rm: u32,
    ) {
        let rm_value = self.reg(rm as usize);
        let rs_value = self.reg(rs as usize);
        let accumulator =
            ((self.reg(rdhi as usize) as u64) << 32) | self.reg(rdlo as usize) as u64;

        let result: u64 = match variant {
            ArmModeMultiplyLongVariant::Umull => rm_value as u64 * rs_value as u64,
            ArmModeMultiplyLongVariant::Umlal => {
                (rm_value as u64 * rs_value as u64).wrapping_add(accumulator)
            }
            ArmModeMultiplyLongVariant::Smull => {
                (rm_value as i32 as i64).wrapping_mul(rs_value as i32 as i64) as u64
            }
            ArmModeMultiplyLongVariant::Smlal => (rm_value as i32 as i64)
                .wrapping_mul(rs_value as i32 as i64)
                .wrapping_add(accumulator as i64) as u64,
        };

        self.set_reg(rdlo as usize, result as u32);
        self.set_reg(rdhi as usize, (result >> 32) as u32);

        if should_set_codes {
            self.cpsr.set_zero_flag(result == 0);
            self.cpsr.set_sign_flag(result.get_bit_64(63));
        }
    }

    #[allow(clippy::too_many_arguments)]
    pub(crate) fn single_data_transfer(
        &mut self,
        kind: SingleDataTransferKind,
        quantity: ReadWriteKind,
        write_back: bool,
        indexing: Indexing,
        rd: u32,
        base_register: u32,
        offset_info: SingleDataTransferOffsetInfo,
        offsetting: Offsetting,
        bus: &mut Bus,
    ) {
        let offset = match offset_info {
            SingleDataTransferOffsetInfo::Immediate { offset } => offset,
            SingleDataTransferOffsetInfo::RegisterImmediate {
                shift_amount,
                shift_kind,
                reg_offset,
            } => {
                let rm = self.reg(reg_offset as usize);
                // The shift result feeds the address; carry stays put.
                shift(shift_kind, shift_amount, rm, self.cpsr.carry_flag()).result
            }
        };

        let offset = match offsetting {
            Offsetting::Up => offset,
            Offsetting::Down => offset.wrapping_neg(),
        };

        let mut address = self.reg(base_register as usize);
        if indexing == Indexing::Pre {
            address = address.wrapping_add(offset);
        }

        match kind {
            SingleDataTransferKind::Ldr => {
                let value = match quantity {
                    ReadWriteKind::Word => bus.read_word(address as usize),
                    ReadWriteKind::Byte => bus.read_byte(address as usize) as u32,
                };
                self.set_reg(rd as usize, value);
            }
            SingleDataTransferKind::Str => {
                let mut value = self.reg(rd as usize);
                if rd == REG_PROGRAM_COUNTER {
                    // A stored PC reads 12 ahead of the instruction.
                    value = value.wrapping_add(4);
                }
                match quantity {
                    ReadWriteKind::Word => bus.write_word(address as usize, value),
                    ReadWriteKind::Byte => bus.write_byte(address as usize, value as u8),
                }
            }
        }

        if indexing == Indexing::Post {
            address = address.wrapping_add(offset);
        }

        // Post-indexing always writes the base back.
        let write_back = write_back || indexing == Indexing::Post;
        if write_back && base_register != rd {
            self.set_reg(base_register as usize, address);
        }
    }

    #[allow(clippy::too_many_arguments)]
    pub(crate) fn half_word_data_transfer(
        &mut self,
        indexing: Indexing,
        offsetting: Offsetting,
        write_back: bool,
        load_store_kind: LoadStoreKind,
        offset_kind: HalfwordDataTransferOffsetKind,
        base_register: u32,
        src_dst_register: u32,
        transfer_kind: HalfwordTransferKind,
        bus: &mut Bus,
    ) {
        let offset = match offset_kind {
            HalfwordDataTransferOffsetKind::Register { register } => {
                if register == REG_PROGRAM_COUNTER {
                    warning("halfword transfer offset register is R15");
                }
                self.reg(register as usize)
            }
            HalfwordDataTransferOffsetKind::Immediate { offset } => offset,
        };

        let offset = match offsetting {
            Offsetting::Up => offset,
            Offsetting::Down => offset.wrapping_neg(),
        };

        let mut address = self.reg(base_register as usize);
        if indexing == Indexing::Pre {
            address = address.wrapping_add(offset);
        }

        match (load_store_kind, transfer_kind) {
            (LoadStoreKind::Store, HalfwordTransferKind::UnsignedHalfwords) => {
                let mut value = self.reg(src_dst_register as usize);
                if src_dst_register == REG_PROGRAM_COUNTER {
                    value = value.wrapping_add(4);
                }
                bus.write_half_word(address as usize, value as u16);
            }
            (LoadStoreKind::Load, HalfwordTransferKind::UnsignedHalfwords) => {
                let value = bus.read_half_word(address as usize) as u32;
                // A misaligned LDRH shows the halfword rotated.
                let value = if address & 1 != 0 {
                    value.rotate_right(8)
                } else {
                    value
                };
                self.set_reg(src_dst_register as usize, value);
            }
            (LoadStoreKind::Load, HalfwordTransferKind::SignedByte) => {
                let value = bus.read_byte(address as usize) as u32;
                self.set_reg(src_dst_register as usize, value.sign_extended(8));
            }
            (LoadStoreKind::Load, HalfwordTransferKind::SignedHalfwords) => {
                let value = bus.read_half_word(address as usize) as u32;
                self.set_reg(src_dst_register as usize, value.sign_extended(16));
            }
            (LoadStoreKind::Store, _) => {
                error("halfword store with a signed transfer kind");
            }
        }

        if indexing == Indexing::Post {
            address = address.wrapping_add(offset);
        }

        let write_back = write_back || indexing == Indexing::Post;
        if write_back && base_register != src_dst_register {
            self.set_reg(base_register as usize, address);
        }
    }

    #[allow(clippy::too_many_arguments)]
    pub(crate) fn block_data_transfer(
        &mut self,
        indexing: Indexing,
        offsetting: Offsetting,
        load_psr: bool,
        write_back: bool,
        load_store: LoadStoreKind,
        rn: u32,
        register_list: u32,
        bus: &mut Bus,
    ) {
        let base = self.reg(rn as usize);
        let mut address = base;

        if register_list == 0 {
            // Empty register list: transfer R15 only and move the base by
            // a full 16-register block.
            match load_store {
                LoadStoreKind::Store => {
                    bus.write_word(address as usize, self.reg(15).wrapping_add(4));
                }
                LoadStoreKind::Load => {
                    let value = bus.read_word(address as usize);
                    self.set_reg(15, value);
                }
            }

            let moved = match offsetting {
                Offsetting::Up => base.wrapping_add(0x40),
                Offsetting::Down => base.wrapping_sub(0x40),
            };
            self.set_reg(rn as usize, moved);

            warning("block data transfer with an empty register list");
            return;
        }

        let first_register = (0..16u8).find(|i| register_list.get_bit(*i)).unwrap();

        if load_psr && !(load_store == LoadStoreKind::Load && register_list.get_bit(15)) {
            // The S-bit user-bank transfer form; games don't use it and
            // the current bank is close enough to keep running.
            important("LDM/STM S-bit user-bank transfer not implemented, using current bank");
        }

        let mut write_back = write_back;
        if load_store == LoadStoreKind::Load && register_list.get_bit(rn as u8) {
            // A loaded base wins over the write-back.
            write_back = false;
        }

        match offsetting {
            Offsetting::Up => {
                for x in 0..16u8 {
                    if !register_list.get_bit(x) {
                        continue;
                    }
                    if indexing == Indexing::Pre {
                        address = address.wrapping_add(4);
                    }
                    self.block_transfer_one(load_store, x, first_register, rn, base, address, bus);
                    if indexing == Indexing::Post {
                        address = address.wrapping_add(4);
                    }
                }
            }
            Offsetting::Down => {
                for x in (0..16u8).rev() {
                    if !register_list.get_bit(x) {
                        continue;
                    }
                    if indexing == Indexing::Pre {
                        address = address.wrapping_sub(4);
                    }
                    self.block_transfer_one(load_store, x, first_register, rn, base, address, bus);
                    if indexing == Indexing::Post {
                        address = address.wrapping_sub(4);
                    }
                }
            }
        }

        if write_back {
            self.set_reg(rn as usize, address);
        }

        if load_psr && load_store == LoadStoreKind::Load && register_list.get_bit(15) {
            // `LDM {..., R15}^` is the other exception-return idiom.
            if matches!(self.cpsr.mode(), Mode::User | Mode::System) {
                error("LDM with S-bit outside an exception mode");
            } else {
                let spsr = self.spsr;
                self.swap_mode(spsr.mode());
                self.cpsr = spsr;
            }
        }
    }

    fn block_transfer_one(
        &mut self,
        load_store: LoadStoreKind,
        x: u8,
        first_register: u8,
        base_register: u32,
        old_base: u32,
        address: u32,
        bus: &mut Bus,
    ) {
        match load_store {
            LoadStoreKind::Store => {
                // Storing the base: the original value goes out when the
                // base is the first register in the list.
                let value = if u32::from(x) == base_register && x == first_register {
                    old_base
                } else {
                    let mut value = self.reg(x as usize);
                    if x == 15 {
                        value = value.wrapping_add(4);
                    }
                    value
                };
                bus.write_word(address as usize, value);
            }
            LoadStoreKind::Load => {
                let value = bus.read_word(address as usize);
                self.set_reg(x as usize, value);
            }
        }
    }

    pub(crate) fn single_data_swap(
        &mut self,
        byte: bool,
        base_register: u32,
        destination_register: u32,
        source_register: u32,
        bus: &mut Bus,
    ) {
        let address = self.reg(base_register as usize) as usize;

        if byte {
            let old = bus.read_byte(address);
            bus.write_byte(address, self.reg(source_register as usize) as u8);
            self.set_reg(destination_register as usize, old as u32);
        } else {
            let old = bus.read_word(address);
            bus.write_word(address, self.reg(source_register as usize));
            self.set_reg(destination_register as usize, old);
        }
    }
}

/// `Bits` stops at u32; multiply-long needs one bit of a u64.
trait Bit64 {
    fn get_bit_64(self, bit: u8) -> bool;
}

impl Bit64 for u64 {
    fn get_bit_64(self, bit: u8) -> bool {
        (self >> bit) & 1 != 0
    }
}
