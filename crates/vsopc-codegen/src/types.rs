//! Maps VSOP types to LLVM types.
//!
//! Class types lower to a pointer to the class's object struct; `unit`
//! lowers to an empty struct so it still has a concrete, zero-size LLVM
//! representation that can flow through `let`/`if`/return positions like
//! any other value.

use inkwell::context::Context;
use inkwell::types::{BasicTypeEnum, StructType};
use std::collections::HashMap;
use vsopc_sem::Type;
use vsopc_util::Symbol;

pub struct TypeMapper<'ctx> {
    context: &'ctx Context,
    /// `%class.<Name>` object struct types, keyed by class name.
    pub object_types: HashMap<Symbol, StructType<'ctx>>,
    /// `%vtable.<Name>` vtable struct types, keyed by class name.
    pub vtable_types: HashMap<Symbol, StructType<'ctx>>,
    unit_type: StructType<'ctx>,
}

impl<'ctx> TypeMapper<'ctx> {
    pub fn new(context: &'ctx Context) -> Self {
        Self {
            context,
            object_types: HashMap::new(),
            vtable_types: HashMap::new(),
            unit_type: context.struct_type(&[], false),
        }
    }

    pub fn basic_type(&self, ty: Type) -> BasicTypeEnum<'ctx> {
        match ty {
            Type::Int32 => self.context.i32_type().into(),
            Type::Bool => self.context.bool_type().into(),
            Type::String => self.context.ptr_type(inkwell::AddressSpace::default()).into(),
            Type::Unit => self.unit_type.into(),
            Type::Class(_) => self.context.ptr_type(inkwell::AddressSpace::default()).into(),
        }
    }

    /// Opaque pointers mean every class lowers to the same `ptr` LLVM type;
    /// this only exists to fail loudly if a class slips through unregistered.
    pub fn require_class(&self, name: Symbol) -> &StructType<'ctx> {
        self.object_types
            .get(&name)
            .expect("object struct type must be predeclared before use")
    }

    pub fn unit_type(&self) -> StructType<'ctx> {
        self.unit_type
    }

    pub fn unit_value(&self) -> inkwell::values::StructValue<'ctx> {
        self.unit_type.const_named_struct(&[])
    }
}
