//! LLVM IR lowering (spec.md §4.3).
//!
//! Every class becomes an object struct (`struct.C`: vtable pointer followed
//! by fields, inherited-first) and a vtable struct (`struct.C.VTable`: one
//! function pointer per distinct method name visible on the class). A
//! subclass's object and vtable structs are always prefix-compatible
//! extensions of its parent's (see [`crate::layout`]), so a method or field
//! access compiled against a static class's struct type produces the right
//! offset no matter which subclass the object actually is at runtime - the
//! same trick `struct.Base.VTable`'s slots play when a subclass appends new
//! methods after them.
//!
//! `Object`'s six built-ins have no VSOP body; their vtable slots point
//! directly at external symbols resolved from the hand-written runtime
//! object file linked in by `vsopc-driver`.

use inkwell::context::Context;
use inkwell::module::{Linkage, Module};
use inkwell::types::{BasicType, FunctionType};
use inkwell::values::{BasicValue, BasicValueEnum, FunctionValue, GlobalValue, PointerValue};
use inkwell::{AddressSpace, IntPredicate};
use std::collections::HashMap;

use vsopc_ast::{BinOp, Type as AstType, UnOp};
use vsopc_sem::{ClassGraph, Type as SemType, TypedClass, TypedExpr, TypedExprKind, TypedProgram};
use vsopc_util::Symbol;

use crate::error::{CodeGenError, Result};
use crate::layout;
use crate::types::TypeMapper;

/// Local variable allocas in scope at a point in a method body, keyed by
/// name; shadowed on `let` and restored on scope exit, mirroring
/// `vsopc_sem::Scope`'s own push/pop discipline over the same names.
struct Env<'ctx> {
    self_ptr: PointerValue<'ctx>,
    locals: HashMap<Symbol, PointerValue<'ctx>>,
}

pub struct Lowerer<'ctx, 'a> {
    context: &'ctx Context,
    module: Module<'ctx>,
    builder: inkwell::builder::Builder<'ctx>,
    types: TypeMapper<'ctx>,
    graph: &'a ClassGraph,
    /// `(declaring_class, method_name) -> function`, one entry per method
    /// *declaration* (not per override chain member).
    functions: HashMap<(Symbol, Symbol), FunctionValue<'ctx>>,
    init_fns: HashMap<Symbol, FunctionValue<'ctx>>,
    new_fns: HashMap<Symbol, FunctionValue<'ctx>>,
    vtables: HashMap<Symbol, GlobalValue<'ctx>>,
    malloc_fn: FunctionValue<'ctx>,
    strcmp_fn: FunctionValue<'ctx>,
    powi_fn: FunctionValue<'ctx>,
}

impl<'ctx, 'a> Lowerer<'ctx, 'a> {
    pub fn new(context: &'ctx Context, module_name: &str, graph: &'a ClassGraph) -> Self {
        let module = context.create_module(module_name);
        let builder = context.create_builder();
        let types = TypeMapper::new(context);

        let ptr_ty = context.ptr_type(AddressSpace::default());
        let malloc_ty = ptr_ty.fn_type(&[context.i64_type().into()], false);
        let malloc_fn = module.add_function("malloc", malloc_ty, Some(Linkage::External));

        let strcmp_ty = context
            .i32_type()
            .fn_type(&[ptr_ty.into(), ptr_ty.into()], false);
        let strcmp_fn = module.add_function("strcmp", strcmp_ty, Some(Linkage::External));

        let powi_ty = context
            .f64_type()
            .fn_type(&[context.f64_type().into(), context.i32_type().into()], false);
        let powi_fn =
            module.add_function("llvm.powi.f64.i32", powi_ty, Some(Linkage::External));

        Self {
            context,
            module,
            builder,
            types,
            graph,
            functions: HashMap::new(),
            init_fns: HashMap::new(),
            new_fns: HashMap::new(),
            vtables: HashMap::new(),
            malloc_fn,
            strcmp_fn,
            powi_fn,
        }
    }

    pub fn into_module(self) -> Module<'ctx> {
        self.module
    }

    pub fn print_ir(&self) -> String {
        self.module.print_to_string().to_string()
    }

    /// Lower a whole typed program into `self.module`. Must be called at
    /// most once per `Lowerer`.
    pub fn lower_program(&mut self, program: &TypedProgram) -> Result<()> {
        self.declare_struct_types();
        self.declare_object_builtins();
        self.declare_class_functions(program);
        self.emit_vtable_globals();
        self.emit_init_bodies(program);
        self.emit_new_bodies();
        self.emit_method_bodies(program);
        self.emit_main()?;
        self.module
            .verify()
            .map_err(|e| CodeGenError::LlvmOperationFailed(e.to_string()))
    }

    // -- type and function predeclaration -------------------------------

    fn declare_struct_types(&mut self) {
        let names: Vec<Symbol> = self.graph.classes().map(|c| c.name).collect();
        for name in &names {
            let obj_ty = self.context.opaque_struct_type(&format!("struct.{name}"));
            let vt_ty = self
                .context
                .opaque_struct_type(&format!("struct.{name}.VTable"));
            self.types.object_types.insert(*name, obj_ty);
            self.types.vtable_types.insert(*name, vt_ty);
        }
        for name in &names {
            let ptr_ty = self.context.ptr_type(AddressSpace::default());
            let mut fields: Vec<inkwell::types::BasicTypeEnum> = vec![ptr_ty.into()];
            for field in layout::field_layout(self.graph, *name) {
                fields.push(self.types.basic_type(SemType::from(field.ty)));
            }
            self.types.object_types[name].set_body(&fields, false);

            let slot_count = layout::vtable_layout(self.graph, *name).len();
            let slots = vec![ptr_ty.into(); slot_count];
            self.types.vtable_types[name].set_body(&slots, false);
        }
    }

    fn fn_type_for(&self, ret: AstType, formals: &[(Symbol, AstType)]) -> FunctionType<'ctx> {
        let ptr_ty = self.context.ptr_type(AddressSpace::default());
        let mut params: Vec<inkwell::types::BasicMetadataTypeEnum> = vec![ptr_ty.into()];
        for (_, ty) in formals {
            params.push(self.types.basic_type(SemType::from(*ty)).into());
        }
        self.types.basic_type(SemType::from(ret)).fn_type(&params, false)
    }

    fn declare_object_builtins(&mut self) {
        let object = Symbol::intern("Object");
        let string_t = AstType::StringT;
        let bool_t = AstType::Bool;
        let int_t = AstType::Int32;
        let object_t = AstType::Class(object);
        let sym = Symbol::intern;

        let builtins: &[(&str, &str, &[(&str, AstType)], AstType)] = &[
            ("print", "Object_print", &[("s", string_t)], object_t),
            ("printBool", "Object_printBool", &[("b", bool_t)], object_t),
            ("printInt32", "Object_printInt32", &[("i", int_t)], object_t),
            ("inputLine", "Object_inputLine", &[], string_t),
            ("inputBool", "Object_inputBool", &[], bool_t),
            ("inputInt32", "Object_inputInt32", &[], int_t),
        ];
        for (method, symbol_name, formals, ret) in builtins {
            let fn_ty = self.fn_type_for(*ret, formals);
            let f = self.module.add_function(symbol_name, fn_ty, Some(Linkage::External));
            self.functions.insert((object, sym(method)), f);
        }
    }

    fn declare_class_functions(&mut self, program: &TypedProgram) {
        let ptr_ty = self.context.ptr_type(AddressSpace::default());
        for class in &program.classes {
            let init_ty = self.context.void_type().fn_type(&[ptr_ty.into()], false);
            let init_fn =
                self.module
                    .add_function(&format!("{}.__init", class.name), init_ty, None);
            self.init_fns.insert(class.name, init_fn);

            let new_ty = ptr_ty.fn_type(&[], false);
            let new_fn = self.module.add_function(&format!("{}.__new", class.name), new_ty, None);
            self.new_fns.insert(class.name, new_fn);

            for method in &class.methods {
                let mut params: Vec<inkwell::types::BasicMetadataTypeEnum> = vec![ptr_ty.into()];
                for (_, ty) in &method.formals {
                    params.push(self.types.basic_type(*ty).into());
                }
                let fn_ty = self.types.basic_type(method.ret_ty).fn_type(&params, false);
                let f = self.module.add_function(
                    &format!("{}.{}", class.name, method.name),
                    fn_ty,
                    None,
                );
                self.functions.insert((class.name, method.name), f);
            }
        }

        // `Object` has no `TypedClass` (it is never parsed); still give it
        // trivial `__init`/`__new` so `new Object` lowers like any other class.
        let object = Symbol::intern("Object");
        let init_ty = self.context.void_type().fn_type(&[ptr_ty.into()], false);
        self.init_fns
            .insert(object, self.module.add_function("Object.__init", init_ty, None));
        let new_ty = ptr_ty.fn_type(&[], false);
        self.new_fns
            .insert(object, self.module.add_function("Object.__new", new_ty, None));
    }

    fn emit_vtable_globals(&mut self) {
        let names: Vec<Symbol> = self.graph.classes().map(|c| c.name).collect();
        for name in names {
            let slots = layout::vtable_layout(self.graph, name);
            let vt_ty = self.types.vtable_types[&name];
            let values: Vec<BasicValueEnum> = slots
                .iter()
                .map(|slot| {
                    let f = self.functions[&(slot.info.declared_in, slot.name)];
                    f.as_global_value().as_pointer_value().into()
                })
                .collect();
            let init = vt_ty.const_named_struct(&values);
            let global = self.module.add_global(vt_ty, None, &format!("{name}.VTable"));
            global.set_initializer(&init);
            global.set_constant(true);
            self.vtables.insert(name, global);
        }
    }

    // -- body emission ----------------------------------------------------

    fn emit_init_bodies(&mut self, program: &TypedProgram) {
        for class in &program.classes {
            let f = self.init_fns[&class.name];
            let entry = self.context.append_basic_block(f, "entry");
            self.builder.position_at_end(entry);
            let self_ptr = f.get_nth_param(0).unwrap().into_pointer_value();

            if let Some(parent) = self.graph.get(class.name).and_then(|c| c.parent) {
                let parent_init = self.init_fns[&parent];
                self.builder
                    .build_call(parent_init, &[self_ptr.into()], "")
                    .unwrap();
            }

            let mut env = Env { self_ptr, locals: HashMap::new() };
            for field in &class.fields {
                if field.ty == SemType::Unit {
                    if let Some(init) = &field.init {
                        self.lower_expr(init, &mut env).unwrap();
                    }
                    continue;
                }
                let idx = layout::field_index(self.graph, class.name, field.name)
                    .expect("own field must appear in its declaring class's layout");
                let value = match &field.init {
                    Some(init) => self.lower_expr(init, &mut env).unwrap(),
                    None => self.default_value(field.ty),
                };
                let struct_ty = self.types.object_types[&class.name];
                let slot = self
                    .builder
                    .build_struct_gep(struct_ty, self_ptr, (idx + 1) as u32, "field")
                    .unwrap();
                self.builder.build_store(slot, value).unwrap();
            }
            self.builder.build_return(None).unwrap();
        }

        let object = Symbol::intern("Object");
        let f = self.init_fns[&object];
        let entry = self.context.append_basic_block(f, "entry");
        self.builder.position_at_end(entry);
        self.builder.build_return(None).unwrap();
    }

    fn emit_new_bodies(&mut self) {
        let names: Vec<Symbol> = self.graph.classes().map(|c| c.name).collect();
        for name in names {
            let new_fn = self.new_fns[&name];
            let entry = self.context.append_basic_block(new_fn, "entry");
            self.builder.position_at_end(entry);

            let struct_ty = self.types.object_types[&name];
            let size = struct_ty
                .size_of()
                .expect("object struct types are always sized");
            let raw = self
                .builder
                .build_call(self.malloc_fn, &[size.into()], "raw")
                .unwrap()
                .try_as_basic_value()
                .left()
                .unwrap()
                .into_pointer_value();

            let vt_slot = self
                .builder
                .build_struct_gep(struct_ty, raw, 0, "vtable_slot")
                .unwrap();
            let vt_ptr = self.vtables[&name].as_pointer_value();
            self.builder.build_store(vt_slot, vt_ptr).unwrap();

            self.builder
                .build_call(self.init_fns[&name], &[raw.into()], "")
                .unwrap();
            self.builder.build_return(Some(&raw)).unwrap();
        }
    }

    fn emit_method_bodies(&mut self, program: &TypedProgram) {
        for class in &program.classes {
            for method in &class.methods {
                let f = self.functions[&(class.name, method.name)];
                let entry = self.context.append_basic_block(f, "entry");
                self.builder.position_at_end(entry);

                let self_ptr = f.get_nth_param(0).unwrap().into_pointer_value();
                let mut env = Env { self_ptr, locals: HashMap::new() };
                for (i, (name, ty)) in method.formals.iter().enumerate() {
                    let param = f.get_nth_param((i + 1) as u32).unwrap();
                    let alloca = self
                        .builder
                        .build_alloca(self.types.basic_type(*ty), &name.to_string())
                        .unwrap();
                    self.builder.build_store(alloca, param).unwrap();
                    env.locals.insert(*name, alloca);
                }

                let result = self.lower_expr(&method.body, &mut env).unwrap();
                self.builder.build_return(Some(&result)).unwrap();
            }
        }
    }

    fn emit_main(&mut self) -> Result<()> {
        let main_sym = Symbol::intern("Main");
        let method_sym = Symbol::intern("main");
        let new_main = *self
            .new_fns
            .get(&main_sym)
            .ok_or_else(|| CodeGenError::UnknownClass("Main".into()))?;
        let main_method = *self
            .functions
            .get(&(main_sym, method_sym))
            .ok_or_else(|| CodeGenError::UnknownMethod("Main.main".into()))?;

        let fn_ty = self.context.i32_type().fn_type(&[], false);
        let entry_fn = self.module.add_function("main", fn_ty, None);
        let entry = self.context.append_basic_block(entry_fn, "entry");
        self.builder.position_at_end(entry);

        let instance = self
            .builder
            .build_call(new_main, &[], "main_instance")
            .map_err(|e| CodeGenError::LlvmOperationFailed(e.to_string()))?
            .try_as_basic_value()
            .left()
            .unwrap();
        let status = self
            .builder
            .build_call(main_method, &[instance.into()], "status")
            .map_err(|e| CodeGenError::LlvmOperationFailed(e.to_string()))?
            .try_as_basic_value()
            .left()
            .unwrap();
        self.builder
            .build_return(Some(&status))
            .map_err(|e| CodeGenError::LlvmOperationFailed(e.to_string()))?;
        Ok(())
    }

    // -- expression lowering ----------------------------------------------

    fn default_value(&self, ty: SemType) -> BasicValueEnum<'ctx> {
        match ty {
            SemType::Int32 => self.context.i32_type().const_int(0, false).into(),
            SemType::Bool => self.context.bool_type().const_int(0, false).into(),
            SemType::String | SemType::Class(_) => {
                self.context.ptr_type(AddressSpace::default()).const_null().into()
            }
            SemType::Unit => self.types.unit_value().into(),
        }
    }

    fn lower_expr(&mut self, expr: &TypedExpr, env: &mut Env<'ctx>) -> Result<BasicValueEnum<'ctx>> {
        match &expr.kind {
            TypedExprKind::IntLiteral(v) => {
                Ok(self.context.i32_type().const_int(*v as u64, true).into())
            }
            TypedExprKind::BoolLiteral(b) => {
                Ok(self.context.bool_type().const_int(*b as u64, false).into())
            }
            TypedExprKind::UnitLiteral => Ok(self.types.unit_value().into()),
            TypedExprKind::StringLiteral(s) => {
                let ptr = self
                    .builder
                    .build_global_string_ptr(s.as_str(), "str")
                    .map_err(|e| CodeGenError::LlvmOperationFailed(e.to_string()))?;
                Ok(ptr.as_pointer_value().into())
            }
            TypedExprKind::SelfExpr => Ok(env.self_ptr.into()),
            TypedExprKind::Local(name) => {
                let ptr = *env
                    .locals
                    .get(name)
                    .unwrap_or_else(|| panic!("local {name} not bound during lowering"));
                self.builder
                    .build_load(self.types.basic_type(expr.ty), ptr, &name.to_string())
                    .map_err(|e| CodeGenError::LlvmOperationFailed(e.to_string()))
            }
            TypedExprKind::Field { class, name } => {
                if expr.ty == SemType::Unit {
                    return Ok(self.types.unit_value().into());
                }
                let idx = layout::field_index(self.graph, *class, *name)
                    .ok_or_else(|| CodeGenError::UnknownField(name.to_string()))?;
                let struct_ty = self.types.object_types[class];
                let slot = self
                    .builder
                    .build_struct_gep(struct_ty, env.self_ptr, (idx + 1) as u32, "field")
                    .map_err(|e| CodeGenError::LlvmOperationFailed(e.to_string()))?;
                self.builder
                    .build_load(self.types.basic_type(expr.ty), slot, &name.to_string())
                    .map_err(|e| CodeGenError::LlvmOperationFailed(e.to_string()))
            }
            TypedExprKind::Assign { target, value } => {
                let val = self.lower_expr(value, env)?;
                match target {
                    vsopc_sem::typed_ast::AssignTarget::Local(name) => {
                        let ptr = *env
                            .locals
                            .get(name)
                            .unwrap_or_else(|| panic!("local {name} not bound during lowering"));
                        self.builder
                            .build_store(ptr, val)
                            .map_err(|e| CodeGenError::LlvmOperationFailed(e.to_string()))?;
                    }
                    vsopc_sem::typed_ast::AssignTarget::Field { class, name } => {
                        if value.ty != SemType::Unit {
                            let idx = layout::field_index(self.graph, *class, *name)
                                .ok_or_else(|| CodeGenError::UnknownField(name.to_string()))?;
                            let struct_ty = self.types.object_types[class];
                            let slot = self
                                .builder
                                .build_struct_gep(
                                    struct_ty,
                                    env.self_ptr,
                                    (idx + 1) as u32,
                                    "field",
                                )
                                .map_err(|e| CodeGenError::LlvmOperationFailed(e.to_string()))?;
                            self.builder
                                .build_store(slot, val)
                                .map_err(|e| CodeGenError::LlvmOperationFailed(e.to_string()))?;
                        }
                    }
                }
                Ok(val)
            }
            TypedExprKind::UnOp(op, operand) => self.lower_unop(*op, operand, env),
            TypedExprKind::BinOp(op, lhs, rhs) => self.lower_binop(*op, lhs, rhs, env),
            TypedExprKind::If { cond, then_branch, else_branch } => {
                self.lower_if(expr.ty, cond, then_branch, else_branch, env)
            }
            TypedExprKind::While { cond, body } => self.lower_while(cond, body, env),
            TypedExprKind::Let { name, ty, init, body } => {
                let init_val = self.lower_expr(init, env)?;
                let alloca = self
                    .builder
                    .build_alloca(self.types.basic_type(*ty), &name.to_string())
                    .map_err(|e| CodeGenError::LlvmOperationFailed(e.to_string()))?;
                self.builder
                    .build_store(alloca, init_val)
                    .map_err(|e| CodeGenError::LlvmOperationFailed(e.to_string()))?;
                let shadowed = env.locals.insert(*name, alloca);
                let result = self.lower_expr(body, env)?;
                match shadowed {
                    Some(prev) => {
                        env.locals.insert(*name, prev);
                    }
                    None => {
                        env.locals.remove(name);
                    }
                }
                Ok(result)
            }
            TypedExprKind::New(class) => {
                let new_fn = *self
                    .new_fns
                    .get(class)
                    .ok_or_else(|| CodeGenError::UnknownClass(class.to_string()))?;
                self.builder
                    .build_call(new_fn, &[], "new")
                    .map_err(|e| CodeGenError::LlvmOperationFailed(e.to_string()))?
                    .try_as_basic_value()
                    .left()
                    .ok_or_else(|| CodeGenError::LlvmOperationFailed("`new` produced no value".into()))
            }
            TypedExprKind::Call { class, method, args } => {
                let arg_vals = self.lower_args(args, env)?;
                self.lower_dispatch(*class, *method, env.self_ptr, &arg_vals, expr.ty)
            }
            TypedExprKind::MethodCall { receiver, receiver_class, method, args } => {
                let receiver_val = self.lower_expr(receiver, env)?.into_pointer_value();
                let arg_vals = self.lower_args(args, env)?;
                self.lower_dispatch(*receiver_class, *method, receiver_val, &arg_vals, expr.ty)
            }
            TypedExprKind::Block(exprs) => {
                let mut last = self.types.unit_value().into();
                for e in exprs {
                    last = self.lower_expr(e, env)?;
                }
                Ok(last)
            }
        }
    }

    fn lower_args(
        &mut self,
        args: &[TypedExpr],
        env: &mut Env<'ctx>,
    ) -> Result<Vec<BasicValueEnum<'ctx>>> {
        args.iter().map(|a| self.lower_expr(a, env)).collect()
    }

    /// Call `method` as resolved from `static_class`'s vtable, the way every
    /// VSOP call dispatches regardless of whether the receiver came from an
    /// explicit expression or an implicit `self`.
    fn lower_dispatch(
        &mut self,
        static_class: Symbol,
        method: Symbol,
        receiver: PointerValue<'ctx>,
        args: &[BasicValueEnum<'ctx>],
        ret_ty: SemType,
    ) -> Result<BasicValueEnum<'ctx>> {
        let slot_idx = layout::vtable_index(self.graph, static_class, method)
            .ok_or_else(|| CodeGenError::UnknownMethod(method.to_string()))?;
        let method_info = self
            .graph
            .lookup_method(static_class, method)
            .ok_or_else(|| CodeGenError::UnknownMethod(method.to_string()))?;

        let struct_ty = self.types.object_types[&static_class];
        let vt_field = self
            .builder
            .build_struct_gep(struct_ty, receiver, 0, "vtable_field")
            .map_err(|e| CodeGenError::LlvmOperationFailed(e.to_string()))?;
        let ptr_ty = self.context.ptr_type(AddressSpace::default());
        let vt_ptr = self
            .builder
            .build_load(ptr_ty, vt_field, "vtable_ptr")
            .map_err(|e| CodeGenError::LlvmOperationFailed(e.to_string()))?
            .into_pointer_value();

        let vt_struct_ty = self.types.vtable_types[&static_class];
        let slot = self
            .builder
            .build_struct_gep(vt_struct_ty, vt_ptr, slot_idx as u32, "slot")
            .map_err(|e| CodeGenError::LlvmOperationFailed(e.to_string()))?;
        let fn_ptr = self
            .builder
            .build_load(ptr_ty, slot, "fn_ptr")
            .map_err(|e| CodeGenError::LlvmOperationFailed(e.to_string()))?
            .into_pointer_value();

        let fn_ty = self.fn_type_for(method_info.ret_ty, &method_info.formals);
        let mut call_args: Vec<inkwell::values::BasicMetadataValueEnum> = vec![receiver.into()];
        call_args.extend(args.iter().map(|v| (*v).into()));

        let call = self
            .builder
            .build_indirect_call(fn_ty, fn_ptr, &call_args, "call")
            .map_err(|e| CodeGenError::LlvmOperationFailed(e.to_string()))?;
        call.try_as_basic_value()
            .left()
            .ok_or(())
            .or_else(|_| {
                if ret_ty == SemType::Unit {
                    Ok(self.types.unit_value().into())
                } else {
                    Err(CodeGenError::LlvmOperationFailed("call produced no value".into()))
                }
            })
    }

    fn lower_unop(
        &mut self,
        op: UnOp,
        operand: &TypedExpr,
        env: &mut Env<'ctx>,
    ) -> Result<BasicValueEnum<'ctx>> {
        let val = self.lower_expr(operand, env)?;
        match op {
            UnOp::Neg => {
                let i = val.into_int_value();
                Ok(self
                    .builder
                    .build_int_neg(i, "neg")
                    .map_err(|e| CodeGenError::LlvmOperationFailed(e.to_string()))?
                    .into())
            }
            UnOp::Not => {
                let b = val.into_int_value();
                Ok(self
                    .builder
                    .build_not(b, "not")
                    .map_err(|e| CodeGenError::LlvmOperationFailed(e.to_string()))?
                    .into())
            }
            UnOp::IsNull => {
                let ptr = val.into_pointer_value();
                Ok(self
                    .builder
                    .build_is_null(ptr, "isnull")
                    .map_err(|e| CodeGenError::LlvmOperationFailed(e.to_string()))?
                    .into())
            }
        }
    }

    fn lower_binop(
        &mut self,
        op: BinOp,
        lhs: &TypedExpr,
        rhs: &TypedExpr,
        env: &mut Env<'ctx>,
    ) -> Result<BasicValueEnum<'ctx>> {
        if op == BinOp::And {
            return self.lower_and(lhs, rhs, env);
        }

        let lhs_val = self.lower_expr(lhs, env)?;
        let rhs_val = self.lower_expr(rhs, env)?;

        match op {
            BinOp::Add | BinOp::Sub | BinOp::Mul | BinOp::Div => {
                let (a, b) = (lhs_val.into_int_value(), rhs_val.into_int_value());
                let r = match op {
                    BinOp::Add => self.builder.build_int_add(a, b, "add"),
                    BinOp::Sub => self.builder.build_int_sub(a, b, "sub"),
                    BinOp::Mul => self.builder.build_int_mul(a, b, "mul"),
                    BinOp::Div => self.builder.build_int_signed_div(a, b, "div"),
                    _ => unreachable!(),
                };
                Ok(r.map_err(|e| CodeGenError::LlvmOperationFailed(e.to_string()))?.into())
            }
            BinOp::Pow => {
                let (a, b) = (lhs_val.into_int_value(), rhs_val.into_int_value());
                let base = self
                    .builder
                    .build_signed_int_to_float(a, self.context.f64_type(), "base")
                    .map_err(|e| CodeGenError::LlvmOperationFailed(e.to_string()))?;
                let powi = self
                    .builder
                    .build_call(self.powi_fn, &[base.into(), b.into()], "powi")
                    .map_err(|e| CodeGenError::LlvmOperationFailed(e.to_string()))?
                    .try_as_basic_value()
                    .left()
                    .unwrap()
                    .into_float_value();
                Ok(self
                    .builder
                    .build_float_to_signed_int(powi, self.context.i32_type(), "pow")
                    .map_err(|e| CodeGenError::LlvmOperationFailed(e.to_string()))?
                    .into())
            }
            BinOp::Lower | BinOp::LowerEqual => {
                let (a, b) = (lhs_val.into_int_value(), rhs_val.into_int_value());
                let pred = if op == BinOp::Lower {
                    IntPredicate::SLT
                } else {
                    IntPredicate::SLE
                };
                Ok(self
                    .builder
                    .build_int_compare(pred, a, b, "cmp")
                    .map_err(|e| CodeGenError::LlvmOperationFailed(e.to_string()))?
                    .into())
            }
            BinOp::Eq => self.lower_eq(lhs.ty, lhs_val, rhs_val),
            BinOp::And => unreachable!("handled above"),
        }
    }

    fn lower_eq(
        &mut self,
        operand_ty: SemType,
        lhs: BasicValueEnum<'ctx>,
        rhs: BasicValueEnum<'ctx>,
    ) -> Result<BasicValueEnum<'ctx>> {
        match operand_ty {
            SemType::Int32 | SemType::Bool => {
                let (a, b) = (lhs.into_int_value(), rhs.into_int_value());
                Ok(self
                    .builder
                    .build_int_compare(IntPredicate::EQ, a, b, "eq")
                    .map_err(|e| CodeGenError::LlvmOperationFailed(e.to_string()))?
                    .into())
            }
            SemType::String => {
                let (a, b) = (lhs.into_pointer_value(), rhs.into_pointer_value());
                let cmp = self
                    .builder
                    .build_call(self.strcmp_fn, &[a.into(), b.into()], "strcmp")
                    .map_err(|e| CodeGenError::LlvmOperationFailed(e.to_string()))?
                    .try_as_basic_value()
                    .left()
                    .unwrap()
                    .into_int_value();
                let zero = self.context.i32_type().const_int(0, false);
                Ok(self
                    .builder
                    .build_int_compare(IntPredicate::EQ, cmp, zero, "streq")
                    .map_err(|e| CodeGenError::LlvmOperationFailed(e.to_string()))?
                    .into())
            }
            SemType::Unit => Ok(self.context.bool_type().const_int(1, false).into()),
            SemType::Class(_) => {
                let i64_ty = self.context.i64_type();
                let (a, b) = (lhs.into_pointer_value(), rhs.into_pointer_value());
                let a_int = self
                    .builder
                    .build_ptr_to_int(a, i64_ty, "lhs_addr")
                    .map_err(|e| CodeGenError::LlvmOperationFailed(e.to_string()))?;
                let b_int = self
                    .builder
                    .build_ptr_to_int(b, i64_ty, "rhs_addr")
                    .map_err(|e| CodeGenError::LlvmOperationFailed(e.to_string()))?;
                Ok(self
                    .builder
                    .build_int_compare(IntPredicate::EQ, a_int, b_int, "eq")
                    .map_err(|e| CodeGenError::LlvmOperationFailed(e.to_string()))?
                    .into())
            }
        }
    }

    /// `and` short-circuits: if the left side is false the right side is
    /// never evaluated (spec.md §4.3).
    fn lower_and(
        &mut self,
        lhs: &TypedExpr,
        rhs: &TypedExpr,
        env: &mut Env<'ctx>,
    ) -> Result<BasicValueEnum<'ctx>> {
        let function = self.current_function();
        let lhs_val = self.lower_expr(lhs, env)?.into_int_value();
        let rhs_block = self.context.append_basic_block(function, "and.rhs");
        let merge_block = self.context.append_basic_block(function, "and.merge");
        let lhs_block = self.builder.get_insert_block().unwrap();

        self.builder
            .build_conditional_branch(lhs_val, rhs_block, merge_block)
            .map_err(|e| CodeGenError::LlvmOperationFailed(e.to_string()))?;

        self.builder.position_at_end(rhs_block);
        let rhs_val = self.lower_expr(rhs, env)?.into_int_value();
        let rhs_end_block = self.builder.get_insert_block().unwrap();
        self.builder
            .build_unconditional_branch(merge_block)
            .map_err(|e| CodeGenError::LlvmOperationFailed(e.to_string()))?;

        self.builder.position_at_end(merge_block);
        let phi = self
            .builder
            .build_phi(self.context.bool_type(), "and.result")
            .map_err(|e| CodeGenError::LlvmOperationFailed(e.to_string()))?;
        phi.add_incoming(&[
            (&self.context.bool_type().const_int(0, false), lhs_block),
            (&rhs_val, rhs_end_block),
        ]);
        Ok(phi.as_basic_value())
    }

    fn lower_if(
        &mut self,
        result_ty: SemType,
        cond: &TypedExpr,
        then_branch: &TypedExpr,
        else_branch: &TypedExpr,
        env: &mut Env<'ctx>,
    ) -> Result<BasicValueEnum<'ctx>> {
        let function = self.current_function();
        let cond_val = self.lower_expr(cond, env)?.into_int_value();

        let then_block = self.context.append_basic_block(function, "if.then");
        let else_block = self.context.append_basic_block(function, "if.else");
        let merge_block = self.context.append_basic_block(function, "if.merge");

        self.builder
            .build_conditional_branch(cond_val, then_block, else_block)
            .map_err(|e| CodeGenError::LlvmOperationFailed(e.to_string()))?;

        self.builder.position_at_end(then_block);
        let then_val = self.lower_expr(then_branch, env)?;
        let then_end = self.builder.get_insert_block().unwrap();
        self.builder
            .build_unconditional_branch(merge_block)
            .map_err(|e| CodeGenError::LlvmOperationFailed(e.to_string()))?;

        self.builder.position_at_end(else_block);
        let else_val = self.lower_expr(else_branch, env)?;
        let else_end = self.builder.get_insert_block().unwrap();
        self.builder
            .build_unconditional_branch(merge_block)
            .map_err(|e| CodeGenError::LlvmOperationFailed(e.to_string()))?;

        self.builder.position_at_end(merge_block);
        let phi = self
            .builder
            .build_phi(self.types.basic_type(result_ty), "if.result")
            .map_err(|e| CodeGenError::LlvmOperationFailed(e.to_string()))?;
        phi.add_incoming(&[(&then_val, then_end), (&else_val, else_end)]);
        Ok(phi.as_basic_value())
    }

    fn lower_while(
        &mut self,
        cond: &TypedExpr,
        body: &TypedExpr,
        env: &mut Env<'ctx>,
    ) -> Result<BasicValueEnum<'ctx>> {
        let function = self.current_function();
        let cond_block = self.context.append_basic_block(function, "while.cond");
        let body_block = self.context.append_basic_block(function, "while.body");
        let end_block = self.context.append_basic_block(function, "while.end");

        self.builder
            .build_unconditional_branch(cond_block)
            .map_err(|e| CodeGenError::LlvmOperationFailed(e.to_string()))?;

        self.builder.position_at_end(cond_block);
        let cond_val = self.lower_expr(cond, env)?.into_int_value();
        self.builder
            .build_conditional_branch(cond_val, body_block, end_block)
            .map_err(|e| CodeGenError::LlvmOperationFailed(e.to_string()))?;

        self.builder.position_at_end(body_block);
        self.lower_expr(body, env)?;
        self.builder
            .build_unconditional_branch(cond_block)
            .map_err(|e| CodeGenError::LlvmOperationFailed(e.to_string()))?;

        self.builder.position_at_end(end_block);
        Ok(self.types.unit_value().into())
    }

    fn current_function(&self) -> FunctionValue<'ctx> {
        self.builder
            .get_insert_block()
            .unwrap()
            .get_parent()
            .expect("builder is always positioned inside a function body while lowering")
    }
}
