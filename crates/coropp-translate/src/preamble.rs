//! Runtime trait-helper preamble.
//!
//! Emitted once at the head of the output. Everything generated code needs
//! at runtime lives here: the generator interrogation helpers, placement
//! construction/destruction glue, the copy/move gating machinery, and the
//! sub-generator resumption helpers that keep the unwinder armed across a
//! throwing resumption.

/// Include-guard macro name; re-translation of our own output detects this
/// and skips a second injection, keeping the tool idempotent.
pub const GUARD: &str = "__CO_RUNTIME_INCLUDED";

/// Whether `source` already begins with (or contains) the injected preamble.
pub fn already_injected(source: &str) -> bool {
    source.contains(GUARD)
}

/// `#line` directive pointing the downstream compiler at the original source.
pub fn line_directive(line: usize, path: &str) -> String {
    format!("#line {line} \"{path}\"\n")
}

pub fn runtime_preamble() -> &'static str {
    RUNTIME_PREAMBLE
}

const RUNTIME_PREAMBLE: &str = r#"#ifndef __CO_RUNTIME_INCLUDED
#define __CO_RUNTIME_INCLUDED

#include <cstdlib>
#include <new>
#include <exception>
#include <typeinfo>
#include <type_traits>

#if defined(__GNUC__) || defined(__clang__)
# define __CO_UNUSED __attribute__((unused))
#else
# define __CO_UNUSED
#endif

// No-op target of the suspension encoding; keeps untransformed (inline or
// template) resumable functions compilable.
inline void __co_suspend() {}

// Unevaluated-context lvalue maker, for spelling decltypes of expressions
// that mention captures or locals outside their scope.
template <class T> T& __co_lval() noexcept;

// Stands in for the value of a dispatcher epilogue, which sits past the
// is_terminal checks and never executes. Spelled as a call so result types
// are not required to be default-constructible.
template <class T>
[[noreturn]] inline T __co_terminal_result()
{
  ::std::abort();
}

template <class T, class... Args>
inline void __co_new(T* __p, Args&&... __args)
{
  ::new (static_cast<void*>(__p)) T(static_cast<Args&&>(__args)...);
}

template <class T>
inline void __co_copy_new(T* __p, const T& __v)
{
  ::new (static_cast<void*>(__p)) T(__v);
}

template <class T>
inline void __co_move_new(T* __p, T& __v)
{
  ::new (static_cast<void*>(__p)) T(static_cast<T&&>(__v));
}

template <class T>
inline void __co_destroy(T* __p) noexcept
{
  __p->~T();
}

// Invoke __f only when the compile-time condition holds; the callable is a
// generic lambda, so its body is never instantiated when the condition
// fails. This is what keeps non-copyable locals from poisoning the copy
// constructor of a generated lambda.
template <bool __B, class F, class... Args>
inline typename ::std::enable_if<__B>::type __co_call_if(F __f, Args&&... __args)
{
  __f(static_cast<Args&&>(__args)...);
}

template <bool __B, class F, class... Args>
inline typename ::std::enable_if<!__B>::type __co_call_if(F, Args&&...)
{
}

template <class... Ts> struct __co_all_copy_constructible;
template <> struct __co_all_copy_constructible<> : ::std::true_type {};
template <class T, class... Ts>
struct __co_all_copy_constructible<T, Ts...>
  : ::std::integral_constant<bool,
      ::std::is_copy_constructible<T>::value
        && __co_all_copy_constructible<Ts...>::value> {};

template <class... Ts> struct __co_all_move_constructible;
template <> struct __co_all_move_constructible<> : ::std::true_type {};
template <class T, class... Ts>
struct __co_all_move_constructible<T, Ts...>
  : ::std::integral_constant<bool,
      ::std::is_move_constructible<T>::value
        && __co_all_move_constructible<Ts...>::value> {};

// Copy/move gating. When the conjunction over the machine's local types
// fails, the generated constructor's parameter collapses to a dummy type no
// user code can produce, so it stops being a copy (or move) constructor.
// The implicit one the compiler falls back to is deleted through the locals
// union, which is exactly the conjunction again.
struct __co_disabled_base {};
struct __co_disabled_copy : __co_disabled_base {};
struct __co_disabled_move : __co_disabled_base {};

// Declared-only conversion source for the never-callable dummy paths.
struct __co_any
{
  template <class T> operator T() const;
};

template <class L, bool __Enabled>
struct __co_copy_arg { typedef const L& type; };
template <class L>
struct __co_copy_arg<L, false> { typedef const __co_disabled_copy& type; };

template <class L, bool __Enabled>
struct __co_move_arg { typedef L&& type; };
template <class L>
struct __co_move_arg<L, false> { typedef const __co_disabled_move& type; };

template <class L>
inline auto __co_captures_arg(L&& __x) -> decltype((__x.__captures_))
{
  return __x.__captures_;
}
__co_any __co_captures_arg(const __co_disabled_base&);

template <class L>
inline auto __co_state_arg(const L& __x) -> decltype(__x.__state_)
{
  return __x.__state_;
}
int __co_state_arg(const __co_disabled_base&);

// Generator interrogation, as free functions so composed drivers can stay
// agnostic of the concrete generated type.
template <class G>
inline bool is_initial(const G& __g) noexcept
{
  return __g.is_initial();
}

template <class G>
inline bool is_terminal(const G& __g) noexcept
{
  return __g.is_terminal();
}

template <class G>
inline const ::std::type_info& wanted_type(const G& __g) noexcept
{
  return __g.wanted_type();
}

template <class G>
inline void* wanted(G& __g) noexcept
{
  return __g.wanted();
}

template <class G>
inline const void* wanted(const G& __g) noexcept
{
  return __g.wanted();
}

template <class G>
inline bool ready(const G& __g) noexcept
{
  return __g.is_terminal();
}

template <class G>
inline auto resume(G& __g) -> decltype(__g())
{
  return __g();
}

// Project an initializer holder back to its lambda type.
template <class I> using lambda_t = typename I::lambda;

// Identity fallback; the translator consumes initializer(<resumable lambda>)
// itself, this overload only fires for non-resumable arguments.
template <class L>
inline L&& initializer(L&& __l) noexcept
{
  return static_cast<L&&>(__l);
}

// Sub-generator resumption. The unwinder stays armed while the resumption
// runs; only a non-exceptional return disarms it, so a throwing
// sub-generator still unwinds the outer machine.
template <class U, class G>
inline decltype(auto) __co_yield_sub(U& __u, G& __g)
{
  struct __on_success
  {
    U* __u_;
    ~__on_success()
    {
      if (!(::std::uncaught_exceptions() > 0))
        __u_->__this_ = 0;
    }
  } __s = { &__u };
  return __g();
}

// Tail delegation: after the resumption, either suspend the outer machine
// or, when the sub-generator finished on this call, leave the unwinder
// armed so it destroys every live local and lands the state at -1.
template <class U, class G>
inline decltype(auto) __co_return_sub(U& __u, G& __g, int __suspend_state)
{
  struct __after
  {
    U* __u_;
    G* __g_;
    int __state_;
    ~__after()
    {
      if (!(::std::uncaught_exceptions() > 0) && !::is_terminal(*__g_))
      {
        __u_->__this_->__state_ = __state_;
        __u_->__this_ = 0;
      }
    }
  } __a = { &__u, &__g, __suspend_state };
  return __g();
}

// Owns a generated lambda in raw storage so it can be embedded as a field
// of a larger composite generator and constructed in place.
template <class L>
class __co_inplace
{
public:
  __co_inplace() noexcept {}
  __co_inplace(const __co_inplace&) = delete;
  __co_inplace& operator=(const __co_inplace&) = delete;
  ~__co_inplace() {}

  template <class I>
  void construct(I&& __i)
  {
    ::__co_new(&__u_.__lambda_, static_cast<I&&>(__i));
  }

  void destroy()
  {
    ::__co_destroy(&__u_.__lambda_);
  }

  auto operator()() -> decltype(::__co_lval<L>()())
  {
    return __u_.__lambda_();
  }

  bool is_initial() const noexcept { return __u_.__lambda_.is_initial(); }
  bool is_terminal() const noexcept { return __u_.__lambda_.is_terminal(); }
  const ::std::type_info& wanted_type() const noexcept { return __u_.__lambda_.wanted_type(); }
  void* wanted() noexcept { return __u_.__lambda_.wanted(); }
  const void* wanted() const noexcept { return __u_.__lambda_.wanted(); }

private:
  union __u_t
  {
    __u_t() {}
    ~__u_t() {}
    L __lambda_;
  } __u_;
};

#endif // __CO_RUNTIME_INCLUDED
"#;
