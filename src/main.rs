use anyhow::Result;
use rustyline::error::ReadlineError;
use rustyline::DefaultEditor;

use formula_workbench::builder::ExpressionBuilder;
use formula_workbench::config::FieldCatalog;
use formula_workbench::formula::CustomDataSet;
use formula_workbench::session::{SessionStore, WizardSnapshot};
use formula_workbench::validator::{Finalizer, RuleChecker, SaveError};

const CATALOG_FILE: &str = "field_catalog.json";
const SESSION_DIR: &str = ".formula_sessions";

/// 加载字段目录，优先使用JSON配置，失败时使用默认目录
fn load_catalog() -> FieldCatalog {
    match FieldCatalog::from_json_file(CATALOG_FILE) {
        Ok(catalog) => {
            println!("✅ 成功从JSON配置文件加载字段目录");
            println!("✅ 加载了 {} 个数据源字段", catalog.fields().len());
            catalog
        }
        Err(e) => {
            println!("⚠️ 无法加载JSON配置文件 ({}), 使用默认字段目录", e);
            FieldCatalog::default_catalog()
        }
    }
}

fn print_help() {
    println!("可用命令:");
    println!("  data <字段>    追加一个数据引用操作数");
    println!("  num <数字>     追加一个数字");
    println!("  op <符号>      追加运算符 (+ - * / %)");
    println!("  ( / )          追加括号");
    println!("  del            删除最后一个元素");
    println!("  show           显示当前公式与按钮状态");
    println!("  save <名称>    校验并保存公式");
    println!("  list           列出已保存的公式");
    println!("  remove <名称>  删除公式（并移出历史化选择）");
    println!("  hist <名称>    切换名称的历史化选择");
    println!("  fields         列出可用的数据源字段");
    println!("  store / load   保存 / 恢复会话快照");
    println!("  reset          清除会话快照并清空当前状态");
    println!("  quit           退出");
}

fn show_state(builder: &ExpressionBuilder) {
    println!("[当前公式]: {}", builder.render());
    let e = builder.enablement();
    println!(
        "[可用按钮]: 运算符={} 数据={} 数字={} 左括号={} 右括号={}",
        e.operator, e.data_ref, e.number, e.left_paren, e.right_paren
    );
    println!(
        "[括号计数]: 开 {} / 闭 {}  可保存: {}",
        builder.open_count(),
        builder.close_count(),
        builder.can_save()
    );
}

fn handle_save(
    name: &str,
    finalizer: &mut Finalizer,
    builder: &mut ExpressionBuilder,
    set: &mut CustomDataSet,
    catalog: &FieldCatalog,
) {
    match finalizer.save_with(&RuleChecker, name, builder, set, catalog) {
        Ok(formula) => {
            println!("✅ 公式已保存: {} = {}", formula.name, formula.expression_text);
        }
        Err(SaveError::Rejected) => {
            println!("✗ 语法校验未通过，公式保持不变，可修改后重试");
        }
        Err(SaveError::BackendUnavailable(msg)) => {
            println!("❌ 语法校验服务不可用 ({}), 公式保持不变", msg);
        }
        Err(e) => {
            println!("✗ 保存失败: {}", e);
        }
    }
}

fn main() -> Result<()> {
    tracing_subscriber::fmt::init();

    println!("--- Formula Workbench: 自定义公式构建器 ---");
    let catalog = load_catalog();

    let session_id = std::env::args().nth(1).unwrap_or_else(|| "default".to_string());
    let store = SessionStore::new(SESSION_DIR);

    let mut builder = ExpressionBuilder::new();
    let mut set = CustomDataSet::new();
    let mut finalizer = Finalizer::new();

    // 启动时尝试恢复上次的会话快照
    match store.restore(&session_id) {
        Ok(Some(snapshot)) => {
            println!("✅ 已恢复会话 '{}' 的快照", session_id);
            builder = snapshot.builder;
            set = snapshot.custom_data;
        }
        Ok(None) => {}
        Err(e) => println!("⚠️ 会话快照恢复失败: {}", e),
    }

    print_help();
    let mut rl = DefaultEditor::new()?;

    loop {
        let line = match rl.readline("formel> ") {
            Ok(line) => line,
            Err(ReadlineError::Interrupted) | Err(ReadlineError::Eof) => break,
            Err(e) => return Err(e.into()),
        };
        let line = line.trim();
        if line.is_empty() {
            continue;
        }
        rl.add_history_entry(line).ok();

        let (command, arg) = match line.split_once(' ') {
            Some((c, a)) => (c, a.trim()),
            None => (line, ""),
        };
        let enablement = builder.enablement();

        // 禁用按钮在这里拦截，构建器本身信任调用方
        match command {
            "data" => {
                if !enablement.data_ref {
                    println!("⚠️ 当前不能追加数据引用");
                } else if arg.is_empty() {
                    println!("⚠️ 用法: data <字段>");
                } else if !catalog.contains(arg) && !set.contains_formula(arg) {
                    println!("⚠️ 未知字段或公式: {}", arg);
                } else {
                    builder.append_data_ref(arg);
                    println!("[公式]: {}", builder.render());
                }
            }
            "num" => {
                if !enablement.number {
                    println!("⚠️ 当前不能追加数字");
                } else if arg.is_empty() || !arg.chars().all(|c| c.is_ascii_digit() || c == '.') {
                    println!("⚠️ 用法: num <数字>");
                } else {
                    builder.append_number(arg);
                    println!("[公式]: {}", builder.render());
                }
            }
            "op" => {
                if !enablement.operator {
                    println!("⚠️ 当前不能追加运算符");
                } else if !matches!(arg, "+" | "-" | "*" | "/" | "%") {
                    println!("⚠️ 支持的运算符: + - * / %");
                } else {
                    builder.append_operator(arg);
                    println!("[公式]: {}", builder.render());
                }
            }
            "(" => {
                if !enablement.left_paren {
                    println!("⚠️ 当前不能追加左括号");
                } else {
                    builder.append_left_paren();
                    println!("[公式]: {}", builder.render());
                }
            }
            ")" => {
                if !enablement.right_paren {
                    println!("⚠️ 当前不能追加右括号");
                } else {
                    builder.append_right_paren();
                    println!("[公式]: {}", builder.render());
                }
            }
            "del" => match builder.delete_last() {
                Ok(token) => println!("已删除 '{}', [公式]: {}", token.text, builder.render()),
                Err(e) => println!("⚠️ {}", e),
            },
            "show" => show_state(&builder),
            "save" => {
                if arg.is_empty() {
                    println!("⚠️ 用法: save <名称>");
                } else {
                    handle_save(arg, &mut finalizer, &mut builder, &mut set, &catalog);
                }
            }
            "list" => {
                if set.formulas().is_empty() {
                    println!("(还没有保存任何公式)");
                }
                for formula in set.formulas() {
                    let marker = if set.is_historized(&formula.name) {
                        " [历史化]"
                    } else {
                        ""
                    };
                    println!("  {} = {}{}", formula.name, formula.expression_text, marker);
                }
            }
            "remove" => {
                if set.remove_formula(arg) {
                    println!("✅ 已删除公式 {}", arg);
                } else {
                    println!("⚠️ 没有名为 {} 的公式", arg);
                }
            }
            "hist" => {
                if !catalog.contains(arg) && !set.contains_formula(arg) {
                    println!("⚠️ 未知字段或公式: {}", arg);
                } else if set.toggle_historized(arg) {
                    println!("✅ {} 已加入历史化选择", arg);
                } else {
                    println!("✅ {} 已移出历史化选择", arg);
                }
            }
            "fields" => {
                for field in catalog.fields() {
                    println!("  {}", field);
                }
            }
            "store" => {
                let snapshot = WizardSnapshot {
                    builder: builder.clone(),
                    custom_data: set.clone(),
                    name_input: String::new(),
                };
                match store.save(&session_id, &snapshot) {
                    Ok(()) => println!("✅ 会话快照已保存"),
                    Err(e) => println!("❌ {}", e),
                }
            }
            "load" => match store.restore(&session_id) {
                Ok(Some(snapshot)) => {
                    builder = snapshot.builder;
                    set = snapshot.custom_data;
                    println!("✅ 会话快照已恢复");
                    show_state(&builder);
                }
                Ok(None) => println!("⚠️ 会话 '{}' 没有快照", session_id),
                Err(e) => println!("❌ {}", e),
            },
            "reset" => {
                if let Err(e) = store.clear(&session_id) {
                    println!("❌ {}", e);
                }
                builder.clear();
                set = CustomDataSet::new();
                println!("✅ 会话已重置");
            }
            "help" => print_help(),
            "quit" | "exit" => break,
            other => println!("⚠️ 未知命令: {} (help 查看用法)", other),
        }
    }

    Ok(())
}
